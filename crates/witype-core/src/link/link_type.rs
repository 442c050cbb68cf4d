#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::topology::{TOPOLOGY_LITERALS, Topology};
use crate::error::{EngineError, Result};
use crate::lifecycle::Lifecycle;

/// A typed edge between two work item types.
///
/// A link type is usable only once
/// [`check_valid_for_creation`](Self::check_valid_for_creation) passes.
/// Equality covers every attribute, lifecycle included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkItemLinkType {
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub version: u32,
    pub topology: Option<Topology>,
    pub source_type_id: Uuid,
    pub target_type_id: Uuid,
    pub forward_name: String,
    pub reverse_name: String,
    pub link_category_id: Uuid,
    pub space_id: Uuid,
}

/// Attribute changes for a link type; absent members keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkItemLinkTypePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<u32>,
    pub topology: Option<Topology>,
    pub source_type_id: Option<Uuid>,
    pub target_type_id: Option<Uuid>,
    pub forward_name: Option<String>,
    pub reverse_name: Option<String>,
    pub link_category_id: Option<Uuid>,
    pub space_id: Option<Uuid>,
}

fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        Err(EngineError::bad_parameter(field, value))
    } else {
        Ok(())
    }
}

fn require_id(field: &'static str, value: &Uuid) -> Result<()> {
    if value.is_nil() {
        Err(EngineError::bad_parameter(field, value))
    } else {
        Ok(())
    }
}

impl WorkItemLinkType {
    /// Check every attribute a usable link type needs.
    ///
    /// Fail-fast: only the first violation is reported, checked in the order
    /// `name`, `source_type_id`, `target_type_id`, `forward_name`,
    /// `reverse_name`, `topology`, `link_category_id`, `space_id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadParameter`] naming the first empty, nil, or
    /// unset attribute.
    pub fn check_valid_for_creation(&self) -> Result<()> {
        require_text("name", &self.name)?;
        require_id("source_type_id", &self.source_type_id)?;
        require_id("target_type_id", &self.target_type_id)?;
        require_text("forward_name", &self.forward_name)?;
        require_text("reverse_name", &self.reverse_name)?;
        if self.topology.is_none() {
            return Err(EngineError::bad_parameter("topology", "").expected(TOPOLOGY_LITERALS));
        }
        require_id("link_category_id", &self.link_category_id)?;
        require_id("space_id", &self.space_id)
    }

    /// Merge `patch` onto a copy of `self` and re-validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadParameter`] when the merged record fails
    /// [`check_valid_for_creation`](Self::check_valid_for_creation).
    pub fn apply_patch(&self, patch: &WorkItemLinkTypePatch) -> Result<Self> {
        let mut candidate = self.clone();
        if let Some(name) = &patch.name {
            candidate.name.clone_from(name);
        }
        if let Some(description) = &patch.description {
            candidate.description = Some(description.clone());
        }
        if let Some(version) = patch.version {
            candidate.version = version;
        }
        if let Some(topology) = patch.topology {
            candidate.topology = Some(topology);
        }
        if let Some(id) = patch.source_type_id {
            candidate.source_type_id = id;
        }
        if let Some(id) = patch.target_type_id {
            candidate.target_type_id = id;
        }
        if let Some(forward) = &patch.forward_name {
            candidate.forward_name.clone_from(forward);
        }
        if let Some(reverse) = &patch.reverse_name {
            candidate.reverse_name.clone_from(reverse);
        }
        if let Some(id) = patch.link_category_id {
            candidate.link_category_id = id;
        }
        if let Some(id) = patch.space_id {
            candidate.space_id = id;
        }
        candidate.check_valid_for_creation()?;
        Ok(candidate)
    }
}
