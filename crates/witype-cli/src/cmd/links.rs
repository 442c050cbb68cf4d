use clap::Args;
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;
use witype_core::catalog::ResolvedCatalog;
use witype_core::convert::link_type_from_model;
use witype_core::link::{Topology, WorkItemLinkType, check_valid_topology};

use crate::output::{self, pretty_kv, pretty_section, render, render_mode};
use crate::session::Session;

/// Arguments for `wt links`.
#[derive(Args, Debug)]
pub struct LinksArgs {
    /// Show one link type (name or id) as a document instead of listing.
    #[arg(value_name = "LINK_TYPE")]
    pub reference: Option<String>,

    /// Only list link types with this topology.
    #[arg(long, value_name = "TOPOLOGY")]
    pub topology: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LinkRow {
    pub id: Uuid,
    pub name: String,
    pub forward_name: String,
    pub reverse_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology: Option<Topology>,
    pub source: String,
    pub target: String,
    pub category: String,
}

fn type_name(catalog: &ResolvedCatalog, id: &Uuid) -> String {
    catalog
        .types
        .iter()
        .find(|t| t.id == *id)
        .map_or_else(|| id.to_string(), |t| t.name.clone())
}

impl LinkRow {
    fn new(catalog: &ResolvedCatalog, link_type: &WorkItemLinkType) -> Self {
        let category = catalog
            .link_categories
            .iter()
            .find(|c| c.id == link_type.link_category_id)
            .map_or_else(|| link_type.link_category_id.to_string(), |c| c.name.clone());
        Self {
            id: link_type.id,
            name: link_type.name.clone(),
            forward_name: link_type.forward_name.clone(),
            reverse_name: link_type.reverse_name.clone(),
            topology: link_type.topology,
            source: type_name(catalog, &link_type.source_type_id),
            target: type_name(catalog, &link_type.target_type_id),
            category,
        }
    }
}

pub fn collect_rows(catalog: &ResolvedCatalog, topology: Option<Topology>) -> Vec<LinkRow> {
    let mut rows: Vec<LinkRow> = catalog
        .link_types
        .iter()
        .filter(|l| topology.is_none() || l.topology == topology)
        .map(|l| LinkRow::new(catalog, l))
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

fn topology_label(topology: Option<Topology>) -> &'static str {
    topology.map_or("-", Topology::as_str)
}

pub fn run_links(args: &LinksArgs, session: &Session) -> anyhow::Result<()> {
    let catalog = session.load_catalog()?;

    if let Some(reference) = &args.reference {
        let link_type = session.find_link_type(&catalog, reference)?;
        let row = LinkRow::new(&catalog, link_type);
        let document = link_type_from_model(link_type);
        return render(session.output, &document, |_, w| {
            pretty_section(w, &row.name)?;
            pretty_kv(w, "ID", row.id.to_string())?;
            pretty_kv(w, "Forward", &row.forward_name)?;
            pretty_kv(w, "Reverse", &row.reverse_name)?;
            pretty_kv(w, "Topology", topology_label(row.topology))?;
            pretty_kv(w, "Source", &row.source)?;
            pretty_kv(w, "Target", &row.target)?;
            pretty_kv(w, "Category", &row.category)?;
            pretty_kv(w, "Version", link_type.version.to_string())
        });
    }

    let topology = args
        .topology
        .as_deref()
        .map(check_valid_topology)
        .transpose()
        .map_err(|err| output::fail(session.output, err))?;
    let rows = collect_rows(&catalog, topology);

    render_mode(
        session.output,
        &rows,
        |rows, w| {
            for row in rows {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    row.name,
                    topology_label(row.topology),
                    row.source,
                    row.target,
                    row.category
                )?;
            }
            Ok(())
        },
        |rows, w| {
            pretty_section(w, &format!("Link types ({})", rows.len()))?;
            for row in rows {
                writeln!(
                    w,
                    "{:<24} {:<17} {} -[{}]-> {}  ({} / {})",
                    row.name,
                    topology_label(row.topology),
                    row.source,
                    row.forward_name,
                    row.target,
                    row.category,
                    row.reverse_name
                )?;
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use witype_core::catalog::system_catalog;

    fn system() -> ResolvedCatalog {
        system_catalog()
            .expect("system catalog parses")
            .resolve()
            .expect("system catalog resolves")
    }

    #[test]
    fn rows_resolve_names() {
        let rows = collect_rows(&system(), None);
        assert_eq!(rows.len(), 3);
        let blocker = rows
            .iter()
            .find(|r| r.name == "Bug blocker")
            .expect("bug blocker");
        assert_eq!(blocker.source, "bug");
        assert_eq!(blocker.target, "bug");
        assert_eq!(blocker.category, "system");
    }

    #[test]
    fn topology_filter_keeps_matching_rows() {
        let rows = collect_rows(&system(), Some(Topology::Tree));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Parenting");
    }
}
