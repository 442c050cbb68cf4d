//! Per-invocation context: output mode plus where the catalog comes from.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;
use witype_core::EngineError;
use witype_core::catalog::{Catalog, ResolvedCatalog};
use witype_core::config::{find_project_root, resolve_config};
use witype_core::error::{LINK_TYPE_ENTITY, TYPE_ENTITY};
use witype_core::link::WorkItemLinkType;
use witype_core::model::WorkItemType;

use crate::output::{self, OutputMode};

#[derive(Debug)]
pub struct Session {
    pub output: OutputMode,
    pub catalog_path: Option<PathBuf>,
    pub include_system: bool,
}

impl Session {
    /// Combine command-line overrides with project and user configuration.
    pub fn resolve(
        cwd: &Path,
        format_flag: Option<OutputMode>,
        json_flag: bool,
        catalog_flag: Option<PathBuf>,
        no_system: bool,
    ) -> anyhow::Result<Self> {
        let project_root = find_project_root(cwd);
        let config = resolve_config(project_root.as_deref(), json_flag)
            .context("failed to load configuration")?;
        let output = output::resolve_output_mode(format_flag, &config.resolved_output);
        let catalog_path = catalog_flag.or(config.catalog_path);
        let include_system = !no_system && config.project.catalog.include_system;
        debug!(
            project_root = ?project_root,
            catalog = ?catalog_path,
            include_system,
            "session resolved"
        );
        Ok(Self {
            output,
            catalog_path,
            include_system,
        })
    }

    /// Load, layer and resolve the effective catalog.
    pub fn load_catalog(&self) -> anyhow::Result<ResolvedCatalog> {
        let catalog = Catalog::layered(self.include_system, self.catalog_path.as_deref())?;
        catalog.resolve().map_err(|err| output::fail(self.output, err))
    }

    pub fn find_type<'a>(
        &self,
        catalog: &'a ResolvedCatalog,
        reference: &str,
    ) -> anyhow::Result<&'a WorkItemType> {
        catalog.find_type(reference).ok_or_else(|| {
            output::fail(
                self.output,
                EngineError::NotFound {
                    entity: TYPE_ENTITY,
                    id: reference.to_string(),
                },
            )
        })
    }

    pub fn find_link_type<'a>(
        &self,
        catalog: &'a ResolvedCatalog,
        reference: &str,
    ) -> anyhow::Result<&'a WorkItemLinkType> {
        catalog.find_link_type(reference).ok_or_else(|| {
            output::fail(
                self.output,
                EngineError::NotFound {
                    entity: LINK_TYPE_ENTITY,
                    id: reference.to_string(),
                },
            )
        })
    }
}

/// Read a JSON document from `path`, or from stdin when `path` is `-`.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Display name of a type's direct parent, if the parent is in `catalog`.
pub fn parent_name<'a>(catalog: &'a ResolvedCatalog, wit: &WorkItemType) -> Option<&'a str> {
    let segment = wit.path.parent_segment()?;
    catalog
        .types
        .iter()
        .find(|t| t.sanitized_id() == segment)
        .map(|t| t.name.as_str())
}

/// Names of every ancestor of `wit`, root first.
pub fn ancestor_names<'a>(catalog: &'a ResolvedCatalog, wit: &WorkItemType) -> Vec<&'a str> {
    wit.path
        .ancestor_segments()
        .filter_map(|segment| {
            catalog
                .types
                .iter()
                .find(|t| t.sanitized_id() == segment)
                .map(|t| t.name.as_str())
        })
        .collect()
}
