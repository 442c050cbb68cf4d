use clap::Args;
use serde::Serialize;
use std::io::Write;

use crate::output::render_mode;
use crate::session::Session;

/// Arguments for `wt is-a`.
#[derive(Args, Debug)]
pub struct IsAArgs {
    /// Candidate subtype (name or id).
    #[arg(value_name = "TYPE")]
    pub reference: String,
    /// Candidate ancestor (name or id).
    #[arg(value_name = "ANCESTOR")]
    pub ancestor: String,
}

#[derive(Debug, Serialize)]
struct Containment {
    #[serde(rename = "type")]
    type_name: String,
    ancestor: String,
    result: bool,
}

/// Report whether a type is the ancestor itself or lies beneath it.
pub fn run_is_a(args: &IsAArgs, session: &Session) -> anyhow::Result<()> {
    let catalog = session.load_catalog()?;
    let wit = session.find_type(&catalog, &args.reference)?;
    let ancestor = session.find_type(&catalog, &args.ancestor)?;

    let value = Containment {
        type_name: wit.name.clone(),
        ancestor: ancestor.name.clone(),
        result: wit.is_type_or_subtype_of(&ancestor.id),
    };
    render_mode(
        session.output,
        &value,
        |v, w| writeln!(w, "{}", v.result),
        |v, w| {
            let verdict = if v.result { "is" } else { "is not" };
            writeln!(w, "{} {verdict} a {}", v.type_name, v.ancestor)
        },
    )
}
