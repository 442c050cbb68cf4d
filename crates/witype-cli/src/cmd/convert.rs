use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use witype_core::convert::work_item_from_model;
use witype_core::field::FieldValues;
use witype_core::model::WorkItem;

use crate::output::{self, render, render_mode};
use crate::session::{Session, read_json};

/// Arguments for `wt convert`.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Type whose field schema drives the conversion (name or id).
    #[arg(value_name = "TYPE")]
    pub reference: String,

    /// JSON input file, or `-` for stdin.
    #[arg(value_name = "FILE", default_value = "-")]
    pub file: PathBuf,

    /// Convert external values into stored form instead.
    #[arg(long, conflicts_with = "item")]
    pub to_model: bool,

    /// Input is a whole stored work item rather than a field map.
    #[arg(long)]
    pub item: bool,
}

fn write_fields(fields: &FieldValues, w: &mut dyn Write) -> std::io::Result<()> {
    for (name, value) in fields {
        writeln!(w, "{name}\t{value}")?;
    }
    Ok(())
}

pub fn run_convert(args: &ConvertArgs, session: &Session) -> anyhow::Result<()> {
    let catalog = session.load_catalog()?;
    let wit = session.find_type(&catalog, &args.reference)?;

    if args.item {
        let item: WorkItem = read_json(&args.file)?;
        let resource =
            work_item_from_model(wit, &item).map_err(|err| output::fail(session.output, err))?;
        return render(session.output, &resource, |r, w| {
            writeln!(w, "{}\t{}\tv{}", r.id, wit.name, r.version)?;
            write_fields(&r.fields, w)
        });
    }

    let input: FieldValues = read_json(&args.file)?;
    let converted = if args.to_model {
        wit.convert_fields_to_model(&input)
    } else {
        wit.convert_fields_from_model(&input)
    }
    .map_err(|err| output::fail(session.output, err))?;

    render_mode(
        session.output,
        &converted,
        write_fields,
        |fields, w| {
            for (name, value) in fields {
                writeln!(w, "{name:<26} {value}")?;
            }
            Ok(())
        },
    )
}
