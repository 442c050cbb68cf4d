use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use witype_core::repo::Repository;

use crate::output::{self, pretty_kv, pretty_section, render_mode};
use crate::session::Session;

#[derive(Debug, Serialize)]
struct CheckReport {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    catalog: Option<PathBuf>,
    include_system: bool,
    link_categories: usize,
    types: usize,
    link_types: usize,
    max_depth: usize,
}

/// Resolve the effective catalog and load it into a repository.
///
/// Resolution failures surface through the session with their error code.
pub fn run_check(session: &Session) -> anyhow::Result<()> {
    let catalog = session.load_catalog()?;
    let repo = catalog
        .into_repository()
        .map_err(|err| output::fail(session.output, err))?;

    let types = repo
        .list_types()
        .map_err(|err| output::fail(session.output, err))?;
    let report = CheckReport {
        ok: true,
        catalog: session.catalog_path.clone(),
        include_system: session.include_system,
        link_categories: repo
            .list_link_categories()
            .map_err(|err| output::fail(session.output, err))?
            .len(),
        types: types.len(),
        link_types: repo
            .list_link_types()
            .map_err(|err| output::fail(session.output, err))?
            .len(),
        max_depth: types.iter().map(|t| t.path.depth()).max().unwrap_or(0),
    };

    render_mode(
        session.output,
        &report,
        |r, w| {
            writeln!(
                w,
                "ok\t{} categories\t{} types\t{} link types",
                r.link_categories, r.types, r.link_types
            )
        },
        |r, w| {
            pretty_section(w, "Catalog OK")?;
            let source = r
                .catalog
                .as_ref()
                .map_or_else(|| "(none)".to_string(), |p| p.display().to_string());
            pretty_kv(w, "Catalog", source)?;
            pretty_kv(w, "System", if r.include_system { "included" } else { "excluded" })?;
            pretty_kv(w, "Categories", r.link_categories.to_string())?;
            pretty_kv(w, "Types", r.types.to_string())?;
            pretty_kv(w, "Link types", r.link_types.to_string())?;
            pretty_kv(w, "Max depth", r.max_depth.to_string())
        },
    )
}
