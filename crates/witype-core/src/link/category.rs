use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::lifecycle::Lifecycle;

/// A named group of related link types, e.g. `system` or `user`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkItemLinkCategory {
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub version: u32,
}

impl WorkItemLinkCategory {
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns [`EngineError::BadParameter`] for a nil `id` or empty `name`.
    pub fn check_valid_for_creation(&self) -> Result<()> {
        if self.id.is_nil() {
            return Err(EngineError::bad_parameter("id", self.id));
        }
        if self.name.is_empty() {
            return Err(EngineError::bad_parameter("name", &self.name));
        }
        Ok(())
    }
}
