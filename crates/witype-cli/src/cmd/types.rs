use clap::Args;
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;
use witype_core::catalog::ResolvedCatalog;
use witype_core::model::WorkItemType;

use crate::output::{pretty_section, render_mode};
use crate::session::{Session, ancestor_names, parent_name};

/// Arguments for `wt types`.
#[derive(Args, Debug)]
pub struct TypesArgs {
    /// Only list this type and its descendants (name or id).
    #[arg(long, value_name = "TYPE")]
    pub under: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TypeRow {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub ancestors: Vec<String>,
    pub path: String,
    pub fields: usize,
}

impl TypeRow {
    fn new(catalog: &ResolvedCatalog, wit: &WorkItemType) -> Self {
        Self {
            id: wit.id,
            name: wit.name.clone(),
            parent: parent_name(catalog, wit).map(str::to_string),
            ancestors: ancestor_names(catalog, wit)
                .into_iter()
                .map(str::to_string)
                .collect(),
            path: wit.path.to_string(),
            fields: wit.fields.len(),
        }
    }

    /// Ancestor names followed by the type's own name.
    fn lineage(&self) -> Vec<String> {
        let mut lineage = self.ancestors.clone();
        lineage.push(self.name.clone());
        lineage
    }
}

/// Rows for every type, or for `under` and its descendants, in tree order.
pub fn collect_rows(catalog: &ResolvedCatalog, under: Option<&Uuid>) -> Vec<TypeRow> {
    let mut rows: Vec<TypeRow> = catalog
        .types
        .iter()
        .filter(|wit| under.is_none_or(|id| wit.is_type_or_subtype_of(id)))
        .map(|wit| TypeRow::new(catalog, wit))
        .collect();
    rows.sort_by_cached_key(TypeRow::lineage);
    rows
}

pub fn run_types(args: &TypesArgs, session: &Session) -> anyhow::Result<()> {
    let catalog = session.load_catalog()?;
    let under = args
        .under
        .as_deref()
        .map(|reference| session.find_type(&catalog, reference).map(|wit| wit.id))
        .transpose()?;
    let rows = collect_rows(&catalog, under.as_ref());

    render_mode(
        session.output,
        &rows,
        |rows, w| {
            for row in rows {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    row.name,
                    row.id,
                    row.parent.as_deref().unwrap_or("-"),
                    row.fields
                )?;
            }
            Ok(())
        },
        |rows, w| {
            pretty_section(w, &format!("Work item types ({})", rows.len()))?;
            for row in rows {
                let indent = "  ".repeat(row.ancestors.len());
                let label = format!("{indent}{}", row.name);
                writeln!(w, "{label:<28} {}  {} fields", row.id, row.fields)?;
            }
            Ok(())
        },
    )
}
