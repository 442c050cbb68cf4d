use clap::{Args, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;
use witype_core::convert::{
    LinkTypeDocument, WorkItemTypeDocument, link_type_from_model, link_type_to_model,
    work_item_type_from_model, work_item_type_to_model,
};
use witype_core::link::{Topology, WorkItemLinkType};
use witype_core::model::WorkItemType;
use witype_core::repo::Repository;

use crate::output::{self, render};
use crate::session::{Session, read_json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PatchTarget {
    /// A work item type.
    Type,
    /// A work item link type.
    LinkType,
}

/// Arguments for `wt patch`.
#[derive(Args, Debug)]
pub struct PatchArgs {
    /// Kind of record the document updates.
    #[arg(value_enum)]
    pub target: PatchTarget,

    /// Record to update (name or id).
    #[arg(value_name = "NAME")]
    pub reference: String,

    /// Update document, or `-` for stdin.
    #[arg(value_name = "FILE", default_value = "-")]
    pub file: PathBuf,
}

/// Merge a document onto the stored type and save it with a version check.
pub fn patch_type(
    repo: &impl Repository,
    id: &Uuid,
    document: &WorkItemTypeDocument,
) -> witype_core::Result<WorkItemType> {
    let current = repo.load_type(id)?;
    let merged = work_item_type_to_model(document, &current)?;
    repo.save_type(merged)
}

/// Merge a document onto the stored link type and save it with a version check.
pub fn patch_link_type(
    repo: &impl Repository,
    id: &Uuid,
    document: &LinkTypeDocument,
) -> witype_core::Result<WorkItemLinkType> {
    let current = repo.load_link_type(id)?;
    let merged = link_type_to_model(document, &current)?;
    repo.save_link_type(merged)
}

/// Apply an update document to a record of the effective catalog.
///
/// Nothing is written back to the catalog file; the updated record is
/// printed so it can be reviewed or copied.
pub fn run_patch(args: &PatchArgs, session: &Session) -> anyhow::Result<()> {
    let catalog = session.load_catalog()?;
    let mode = session.output;

    match args.target {
        PatchTarget::Type => {
            let id = session.find_type(&catalog, &args.reference)?.id;
            let document: WorkItemTypeDocument = read_json(&args.file)?;
            let repo = catalog
                .into_repository()
                .map_err(|err| output::fail(mode, err))?;
            let updated =
                patch_type(&repo, &id, &document).map_err(|err| output::fail(mode, err))?;
            render(mode, &work_item_type_from_model(&updated), |_, w| {
                writeln!(w, "{}\t{}\tv{}", updated.name, updated.id, updated.version)
            })
        }
        PatchTarget::LinkType => {
            let id = session.find_link_type(&catalog, &args.reference)?.id;
            let document: LinkTypeDocument = read_json(&args.file)?;
            let repo = catalog
                .into_repository()
                .map_err(|err| output::fail(mode, err))?;
            let updated =
                patch_link_type(&repo, &id, &document).map_err(|err| output::fail(mode, err))?;
            render(mode, &link_type_from_model(&updated), |_, w| {
                let topology = updated.topology.map_or("-", Topology::as_str);
                writeln!(
                    w,
                    "{}\t{}\t{topology}\tv{}",
                    updated.name, updated.id, updated.version
                )
            })
        }
    }
}
