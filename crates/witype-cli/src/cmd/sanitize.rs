use clap::Args;
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;
use witype_core::ident::sanitized_id;

use crate::output::{OutputMode, render};

/// Arguments for `wt sanitize`.
#[derive(Args, Debug)]
pub struct SanitizeArgs {
    /// Identifier to turn into a path segment.
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
struct Sanitized {
    id: Uuid,
    segment: String,
}

pub fn run_sanitize(args: &SanitizeArgs, output: OutputMode) -> anyhow::Result<()> {
    let value = Sanitized {
        id: args.id,
        segment: sanitized_id(&args.id),
    };
    render(output, &value, |v, w| writeln!(w, "{}", v.segment))
}
