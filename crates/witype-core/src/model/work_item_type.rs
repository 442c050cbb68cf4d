//! The work item type entity.
//!
//! A [`WorkItemType`] is a named, versioned field schema with a position in
//! the type taxonomy. The position is encoded in [`TypePath`]; see
//! [`crate::model::path`] for the ancestry contract.
//!
//! # Equality
//!
//! `WorkItemType` derives `PartialEq`, so equality covers every attribute:
//! identifier, lifecycle timestamps, version, name, description, icon, path,
//! and the nested [`FieldSchema`]. An optional description is equal only
//! when both sides are unset or both are set to identical text.

#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::path::TypePath;
use crate::error::{EngineError, Result};
use crate::field::{FieldSchema, FieldValues};
use crate::ident::{self, SYSTEM_CREATED_AT};
use crate::lifecycle::Lifecycle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemType {
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// CSS icon class used when rendering the type.
    #[serde(default)]
    pub icon: String,
    /// Optimistic-concurrency version; bumped by every successful save.
    #[serde(default)]
    pub version: u32,
    pub path: TypePath,
    #[serde(default)]
    pub fields: FieldSchema,
}

/// Attribute changes for a work item type; absent members keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkItemTypePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    /// The version the caller last read.
    pub version: Option<u32>,
    pub fields: Option<FieldSchema>,
}

impl WorkItemType {
    /// A type at the root of the taxonomy.
    #[must_use]
    pub fn new_root(id: Uuid, name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            lifecycle: Lifecycle::default(),
            id,
            name: name.into(),
            description: None,
            icon: icon.into(),
            version: 0,
            path: TypePath::root(&id),
            fields: FieldSchema::new(),
        }
    }

    /// A direct child of `parent`.
    ///
    /// Taking the parent by reference is what guarantees the path names an
    /// existing ancestor chain. The child starts with the parent's fields.
    #[must_use]
    pub fn new_child(
        id: Uuid,
        name: impl Into<String>,
        icon: impl Into<String>,
        parent: &Self,
    ) -> Self {
        Self {
            path: parent.path.child(&id),
            fields: parent.fields.clone(),
            ..Self::new_root(id, name, icon)
        }
    }

    /// The path-segment-safe form of this type's identifier.
    #[must_use]
    pub fn sanitized_id(&self) -> String {
        ident::sanitized_id(&self.id)
    }

    /// True when this type is `type_id` itself or one of its descendants.
    ///
    /// Answered from the path alone; no lookup is performed.
    #[must_use]
    pub fn is_type_or_subtype_of(&self, type_id: &Uuid) -> bool {
        self.id == *type_id || self.path.has_ancestor(type_id)
    }

    /// Convert stored field values into their external representation.
    ///
    /// Every field of the schema is converted except
    /// [`SYSTEM_CREATED_AT`], which is never exposed. A field without a
    /// stored value converts from `null`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Conversion`] for the first field that fails.
    pub fn convert_fields_from_model(&self, stored: &FieldValues) -> Result<FieldValues> {
        let mut external = FieldValues::new();
        for (name, definition) in self.fields.iter() {
            if name == SYSTEM_CREATED_AT {
                continue;
            }
            let value = stored.get(name).unwrap_or(&serde_json::Value::Null);
            external.insert(name.to_string(), definition.convert_from_model(name, value)?);
        }
        Ok(external)
    }

    /// Convert external field values into their stored representation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadParameter`] for a field name the schema does
    /// not declare or a missing required value, and
    /// [`EngineError::Conversion`] for a value of the wrong kind.
    pub fn convert_fields_to_model(&self, external: &FieldValues) -> Result<FieldValues> {
        if let Some(unknown) = external.keys().find(|name| !self.fields.contains(name)) {
            return Err(EngineError::bad_parameter(format!("fields.{unknown}"), unknown)
                .expected(format!("a field of type '{}'", self.name)));
        }
        let mut stored = FieldValues::new();
        for (name, definition) in self.fields.iter() {
            let value = external.get(name).unwrap_or(&serde_json::Value::Null);
            let converted = definition.convert_to_model(name, value)?;
            if !converted.is_null() {
                stored.insert(name.to_string(), converted);
            }
        }
        Ok(stored)
    }

    /// Validate the record before it is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadParameter`] naming the first invalid
    /// attribute: `id`, `name`, `path`, then the field schema.
    pub fn check_valid(&self) -> Result<()> {
        if self.id.is_nil() {
            return Err(EngineError::bad_parameter("id", self.id));
        }
        if self.name.trim().is_empty() {
            return Err(EngineError::bad_parameter("name", &self.name));
        }
        if !self.path.ends_with(&self.id) {
            return Err(EngineError::bad_parameter("path", &self.path)
                .expected(format!("a path ending in {}", self.sanitized_id())));
        }
        self.fields.check_valid()
    }

    /// Merge `patch` onto a copy of `self` and validate the result.
    ///
    /// `self` is left untouched. A patch version, when present, replaces the
    /// version so the persistence layer can compare it with what it stores.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadParameter`] when a present name is empty or
    /// the merged record fails [`check_valid`](Self::check_valid).
    pub fn apply_patch(&self, patch: &WorkItemTypePatch) -> Result<Self> {
        let mut candidate = self.clone();
        if let Some(name) = &patch.name {
            if name.is_empty() {
                return Err(EngineError::bad_parameter("name", name));
            }
            candidate.name.clone_from(name);
        }
        if let Some(description) = &patch.description {
            candidate.description = Some(description.clone());
        }
        if let Some(icon) = &patch.icon {
            candidate.icon.clone_from(icon);
        }
        if let Some(version) = patch.version {
            candidate.version = version;
        }
        if let Some(fields) = &patch.fields {
            candidate.fields = fields.clone();
        }
        candidate.check_valid()?;
        Ok(candidate)
    }
}
