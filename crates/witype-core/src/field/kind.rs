//! Field type descriptors.
//!
//! A [`FieldType`] is either a simple [`Kind`], an enumeration over values of
//! a simple kind, or a list whose elements are of a simple kind. Enum and list
//! types do not nest.
//!
//! The serialized form is a flat table keyed by `kind`:
//!
//! ```toml
//! type = { kind = "string" }
//! type = { kind = "enum", base_type = "string", values = ["open", "closed"] }
//! type = { kind = "list", component_type = "user" }
//! ```
//!
//! Descriptors naming anything else fail to deserialize with
//! [`ConversionError::UnsupportedKind`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConversionError;

/// The simple (non-composite) field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    String,
    Integer,
    Float,
    Boolean,
    /// A point in time; stored as Unix nanoseconds.
    Instant,
    /// A span of time; stored as nanoseconds.
    Duration,
    Url,
    /// Rich text with a markup language tag.
    Markup,
    User,
    Iteration,
    Area,
    Codebase,
    /// Reference to another work item.
    #[serde(rename = "workitem")]
    WorkItem,
}

impl Kind {
    pub const ALL: [Self; 13] = [
        Self::String,
        Self::Integer,
        Self::Float,
        Self::Boolean,
        Self::Instant,
        Self::Duration,
        Self::Url,
        Self::Markup,
        Self::User,
        Self::Iteration,
        Self::Area,
        Self::Codebase,
        Self::WorkItem,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Instant => "instant",
            Self::Duration => "duration",
            Self::Url => "url",
            Self::Markup => "markup",
            Self::User => "user",
            Self::Iteration => "iteration",
            Self::Area => "area",
            Self::Codebase => "codebase",
            Self::WorkItem => "workitem",
        }
    }

    /// Kinds whose values are identifiers of other records.
    #[must_use]
    pub const fn is_reference(self) -> bool {
        matches!(
            self,
            Self::User | Self::Iteration | Self::Area | Self::Codebase | Self::WorkItem
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ConversionError::UnsupportedKind(s.to_string()))
    }
}

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldTypeRepr", into = "FieldTypeRepr")]
pub enum FieldType {
    Simple(Kind),
    /// One value out of a fixed, ordered set.
    Enum { base: Kind, values: Vec<Value> },
    /// Zero or more values of the component kind.
    List { component: Kind },
}

impl FieldType {
    /// Name of the outer kind (`enum`, `list`, or the simple kind).
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Simple(kind) => kind.as_str(),
            Self::Enum { .. } => "enum",
            Self::List { .. } => "list",
        }
    }
}

impl From<Kind> for FieldType {
    fn from(kind: Kind) -> Self {
        Self::Simple(kind)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(kind) => write!(f, "{kind}"),
            Self::Enum { base, values } => write!(f, "enum<{base}>[{}]", values.len()),
            Self::List { component } => write!(f, "list<{component}>"),
        }
    }
}

/// Flat on-disk shape of a [`FieldType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FieldTypeRepr {
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    component_type: Option<String>,
}

impl FieldTypeRepr {
    /// Reject a key that has no meaning for this kind.
    fn forbid(&self, key: &str, present: bool) -> Result<(), ConversionError> {
        if present {
            Err(ConversionError::UnsupportedKind(format!(
                "{} with {key}",
                self.kind
            )))
        } else {
            Ok(())
        }
    }
}

impl TryFrom<FieldTypeRepr> for FieldType {
    type Error = ConversionError;

    fn try_from(repr: FieldTypeRepr) -> Result<Self, Self::Error> {
        match repr.kind.as_str() {
            "enum" => {
                repr.forbid("component_type", repr.component_type.is_some())?;
                let base = repr
                    .base_type
                    .as_deref()
                    .ok_or_else(|| ConversionError::UnsupportedKind("enum without base_type".into()))?
                    .parse()?;
                Ok(Self::Enum {
                    base,
                    values: repr.values.unwrap_or_default(),
                })
            }
            "list" => {
                repr.forbid("base_type", repr.base_type.is_some())?;
                repr.forbid("values", repr.values.is_some())?;
                let component = repr
                    .component_type
                    .as_deref()
                    .ok_or_else(|| {
                        ConversionError::UnsupportedKind("list without component_type".into())
                    })?
                    .parse()?;
                Ok(Self::List { component })
            }
            other => {
                let kind = other.parse()?;
                repr.forbid("base_type", repr.base_type.is_some())?;
                repr.forbid("values", repr.values.is_some())?;
                repr.forbid("component_type", repr.component_type.is_some())?;
                Ok(Self::Simple(kind))
            }
        }
    }
}

impl From<FieldType> for FieldTypeRepr {
    fn from(ft: FieldType) -> Self {
        match ft {
            FieldType::Simple(kind) => Self {
                kind: kind.as_str().to_string(),
                base_type: None,
                values: None,
                component_type: None,
            },
            FieldType::Enum { base, values } => Self {
                kind: "enum".to_string(),
                base_type: Some(base.as_str().to_string()),
                values: Some(values),
                component_type: None,
            },
            FieldType::List { component } => Self {
                kind: "list".to_string(),
                base_type: None,
                values: None,
                component_type: Some(component.as_str().to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn simple_kinds_parse_from_their_names() {
        for kind in Kind::ALL {
            assert_eq!(kind.as_str().parse::<Kind>(), Ok(kind));
        }
        assert_eq!(
            "String".parse::<Kind>(),
            Err(ConversionError::UnsupportedKind("String".into()))
        );
    }

    #[test]
    fn field_type_json_shapes() {
        assert_eq!(
            serde_json::to_value(FieldType::Simple(Kind::WorkItem)).expect("serialize"),
            json!({"kind": "workitem"})
        );
        assert_eq!(
            serde_json::to_value(FieldType::List {
                component: Kind::User
            })
            .expect("serialize"),
            json!({"kind": "list", "component_type": "user"})
        );
        let parsed: FieldType = serde_json::from_value(json!({
            "kind": "enum",
            "base_type": "string",
            "values": ["new", "closed"],
        }))
        .expect("deserialize");
        assert_eq!(
            parsed,
            FieldType::Enum {
                base: Kind::String,
                values: vec![json!("new"), json!("closed")],
            }
        );
    }

    #[test]
    fn nested_composites_are_unsupported() {
        let err = serde_json::from_value::<FieldType>(json!({
            "kind": "list",
            "component_type": "enum",
        }))
        .expect_err("list of enum must be rejected");
        assert!(err.to_string().contains("unsupported field kind 'enum'"));

        let err = serde_json::from_value::<FieldType>(json!({"kind": "blob"}))
            .expect_err("unknown kind must be rejected");
        assert!(err.to_string().contains("blob"));
    }

    #[test]
    fn stray_composite_keys_are_rejected() {
        let cases = [
            json!({"kind": "string", "values": ["a"]}),
            json!({"kind": "integer", "component_type": "user"}),
            json!({"kind": "boolean", "base_type": "string"}),
            json!({"kind": "list", "component_type": "user", "base_type": "string"}),
            json!({"kind": "list", "component_type": "user", "values": []}),
            json!({"kind": "enum", "base_type": "string", "component_type": "user"}),
        ];
        for case in cases {
            let err = serde_json::from_value::<FieldType>(case.clone())
                .expect_err("stray key must be rejected");
            assert!(err.to_string().contains("unsupported field kind"), "{case}: {err}");
        }
    }

    #[test]
    fn field_type_from_toml_table() {
        #[derive(Deserialize)]
        struct Holder {
            r#type: FieldType,
        }
        assert!(
            toml::from_str::<Holder>(r#"type = { kind = "list", component_type = "label" }"#)
                .is_err()
        );

        let holder: Holder = toml::from_str(r#"type = { kind = "markup" }"#).expect("parse");
        assert_eq!(holder.r#type, FieldType::Simple(Kind::Markup));
    }
}
