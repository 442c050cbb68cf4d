#![allow(clippy::module_name_repetitions)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kind::FieldType;
use crate::error::{EngineError, Result};

/// Field values keyed by field name, in either stored or external form.
pub type FieldValues = BTreeMap<String, Value>;

/// Schema entry for a single named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Stored value used when an incoming value is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDefinition {
    #[must_use]
    pub fn new(label: impl Into<String>, field_type: impl Into<FieldType>, required: bool) -> Self {
        Self {
            label: label.into(),
            description: None,
            required,
            field_type: field_type.into(),
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Convert the stored value of field `name` to its external form.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Conversion`] naming `name` when the value does
    /// not match the declared kind.
    pub fn convert_from_model(&self, name: &str, stored: &Value) -> Result<Value> {
        self.field_type
            .convert_from_model(stored)
            .map_err(|source| EngineError::conversion(name, source))
    }

    /// Convert an external value of field `name` to its stored form.
    ///
    /// An absent (`null`) value is replaced by the default, if any, before the
    /// required check.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadParameter`] when a required value is missing
    /// and [`EngineError::Conversion`] when the value does not match the kind.
    pub fn convert_to_model(&self, name: &str, external: &Value) -> Result<Value> {
        let value = match (external, &self.default) {
            (Value::Null, Some(default)) => default,
            _ => external,
        };
        if self.required && value.is_null() {
            return Err(EngineError::bad_parameter(name, "null").expected("a value"));
        }
        self.field_type
            .convert_to_model(value)
            .map_err(|source| EngineError::conversion(name, source))
    }

    /// Check the definition itself is usable.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadParameter`] for an enum without values or a
    /// default that does not fit the declared kind.
    pub fn check_valid(&self, name: &str) -> Result<()> {
        if let FieldType::Enum { values, .. } = &self.field_type {
            if values.is_empty() {
                return Err(EngineError::bad_parameter(format!("fields.{name}.type"), "enum")
                    .expected("at least one enum value"));
            }
        }
        if let Some(default) = &self.default {
            self.field_type
                .convert_to_model(default)
                .map_err(|e| {
                    EngineError::bad_parameter(format!("fields.{name}.default"), default)
                        .expected(e.to_string())
                })?;
        }
        Ok(())
    }
}

/// The field schema of a work item type: field name to definition.
///
/// Equality is structural: two schemas are equal when they have the same
/// key set and equal definitions for every key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema(BTreeMap<String, FieldDefinition>);

impl FieldSchema {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, definition: FieldDefinition) -> Option<FieldDefinition> {
        self.0.insert(name.into(), definition)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.0.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Copy of `self` with every definition of `overrides` layered on top.
    #[must_use]
    pub fn merged_with(&self, overrides: &Self) -> Self {
        let mut merged = self.0.clone();
        merged.extend(overrides.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(merged)
    }

    /// Validate field names and every definition.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadParameter`] for an empty field name or an
    /// invalid definition.
    pub fn check_valid(&self) -> Result<()> {
        for (name, definition) in &self.0 {
            if name.trim().is_empty() {
                return Err(EngineError::bad_parameter("fields", name).expected("non-empty field name"));
            }
            definition.check_valid(name)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, FieldDefinition)> for FieldSchema {
    fn from_iter<I: IntoIterator<Item = (String, FieldDefinition)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FieldSchema {
    type Item = (&'a String, &'a FieldDefinition);
    type IntoIter = std::collections::btree_map::Iter<'a, String, FieldDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Kind;
    use serde_json::json;

    fn schema() -> FieldSchema {
        let mut s = FieldSchema::new();
        s.insert("system.title", FieldDefinition::new("Title", Kind::String, true));
        s.insert(
            "system.state",
            FieldDefinition::new(
                "State",
                FieldType::Enum {
                    base: Kind::String,
                    values: vec![json!("new"), json!("closed")],
                },
                true,
            )
            .with_default(json!("new")),
        );
        s
    }

    #[test]
    fn schema_equality_is_structural() {
        assert_eq!(schema(), schema());

        let mut extra = schema();
        extra.insert("x", FieldDefinition::new("X", Kind::Integer, false));
        assert_ne!(schema(), extra);

        let mut flipped = schema();
        flipped.insert("system.title", FieldDefinition::new("Title", Kind::String, false));
        assert_ne!(schema(), flipped);

        let mut rekinded = schema();
        rekinded.insert("system.title", FieldDefinition::new("Title", Kind::Markup, true));
        assert_ne!(schema(), rekinded);
    }

    #[test]
    fn same_size_different_keys_are_not_equal() {
        let mut a = FieldSchema::new();
        a.insert("a", FieldDefinition::new("A", Kind::String, false));
        let mut b = FieldSchema::new();
        b.insert("b", FieldDefinition::new("A", Kind::String, false));
        assert_eq!(a.len(), b.len());
        assert_ne!(a, b);
    }

    #[test]
    fn enum_values_are_part_of_equality() {
        let mut other = schema();
        other.insert(
            "system.state",
            FieldDefinition::new(
                "State",
                FieldType::Enum {
                    base: Kind::String,
                    values: vec![json!("new"), json!("open")],
                },
                true,
            )
            .with_default(json!("new")),
        );
        assert_ne!(schema(), other);
    }

    #[test]
    fn convert_to_model_applies_default_before_required_check() {
        let s = schema();
        let state = s.get("system.state").expect("state defined");
        assert_eq!(state.convert_to_model("system.state", &Value::Null).expect("default"), json!("new"));

        let title = s.get("system.title").expect("title defined");
        let err = title
            .convert_to_model("system.title", &Value::Null)
            .expect_err("required");
        assert_eq!(err.field(), Some("system.title"));
    }

    #[test]
    fn conversion_errors_name_the_field() {
        let s = schema();
        let title = s.get("system.title").expect("title defined");
        let err = title
            .convert_from_model("system.title", &json!(5))
            .expect_err("mismatch");
        assert!(matches!(err, EngineError::Conversion { ref field, .. } if field == "system.title"));
    }

    #[test]
    fn check_valid_rejects_bad_defaults_and_empty_enums() {
        assert!(schema().check_valid().is_ok());

        let mut s = schema();
        s.insert(
            "x",
            FieldDefinition::new("X", Kind::Integer, false).with_default(json!("seven")),
        );
        let err = s.check_valid().expect_err("bad default");
        assert_eq!(err.field(), Some("fields.x.default"));

        let mut s = FieldSchema::new();
        s.insert(
            "e",
            FieldDefinition::new(
                "E",
                FieldType::Enum {
                    base: Kind::String,
                    values: vec![],
                },
                false,
            ),
        );
        assert_eq!(s.check_valid().expect_err("empty enum").field(), Some("fields.e.type"));
    }

    #[test]
    fn merged_with_overrides_existing_entries() {
        let mut child = FieldSchema::new();
        child.insert("system.title", FieldDefinition::new("Summary", Kind::String, true));
        child.insert("severity", FieldDefinition::new("Severity", Kind::Integer, false));
        let merged = schema().merged_with(&child);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("system.title").map(|d| d.label.as_str()), Some("Summary"));
    }

    #[test]
    fn schema_json_roundtrip() {
        let s = schema();
        let text = serde_json::to_string(&s).expect("serialize");
        let back: FieldSchema = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(s, back);
    }
}
