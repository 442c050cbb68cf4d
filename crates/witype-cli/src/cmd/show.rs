use clap::Args;
use serde::Serialize;
use std::io::Write;
use witype_core::convert::{WorkItemTypeDocument, work_item_type_from_model};
use witype_core::model::WorkItemType;

use crate::output::{pretty_kv, pretty_section, render_mode};
use crate::session::{Session, ancestor_names};

/// Arguments for `wt show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Type name or id.
    #[arg(value_name = "TYPE")]
    pub reference: String,
}

#[derive(Debug, Serialize)]
struct TypeMeta {
    ancestors: Vec<String>,
    subtypes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TypeView {
    #[serde(flatten)]
    document: WorkItemTypeDocument,
    meta: TypeMeta,
    #[serde(skip)]
    wit: WorkItemType,
}

pub fn run_show(args: &ShowArgs, session: &Session) -> anyhow::Result<()> {
    let catalog = session.load_catalog()?;
    let wit = session.find_type(&catalog, &args.reference)?;

    let subtypes = catalog
        .types
        .iter()
        .filter(|t| t.path.has_ancestor(&wit.id))
        .map(|t| t.name.clone())
        .collect();
    let view = TypeView {
        document: work_item_type_from_model(wit),
        meta: TypeMeta {
            ancestors: ancestor_names(&catalog, wit)
                .into_iter()
                .map(str::to_string)
                .collect(),
            subtypes,
        },
        wit: wit.clone(),
    };

    render_mode(
        session.output,
        &view,
        |view, w| {
            let wit = &view.wit;
            writeln!(w, "{}\t{}\t{}\tv{}", wit.name, wit.id, wit.path, wit.version)?;
            for (name, def) in &wit.fields {
                writeln!(w, "{name}\t{}\t{}", def.field_type, def.required)?;
            }
            Ok(())
        },
        |view, w| {
            let wit = &view.wit;
            pretty_section(w, &wit.name)?;
            pretty_kv(w, "ID", wit.id.to_string())?;
            if let Some(description) = &wit.description {
                pretty_kv(w, "About", description)?;
            }
            pretty_kv(w, "Icon", &wit.icon)?;
            pretty_kv(w, "Path", wit.path.as_str())?;
            pretty_kv(w, "Version", wit.version.to_string())?;
            if !view.meta.ancestors.is_empty() {
                pretty_kv(w, "Ancestors", view.meta.ancestors.join(" > "))?;
            }
            if !view.meta.subtypes.is_empty() {
                pretty_kv(w, "Subtypes", view.meta.subtypes.join(", "))?;
            }
            writeln!(w)?;
            pretty_section(w, &format!("Fields ({})", wit.fields.len()))?;
            for (name, def) in &wit.fields {
                let required = if def.required { "required" } else { "" };
                writeln!(w, "{name:<26} {:<20} {required}", def.field_type.to_string())?;
            }
            Ok(())
        },
    )
}
