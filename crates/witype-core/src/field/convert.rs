//! Per-kind conversion between stored and external field values.
//!
//! Values are dynamically typed [`serde_json::Value`]s; the declared
//! [`FieldType`] decides which shapes are acceptable. `null` is accepted by
//! every kind in both directions (requiredness is checked one level up, in
//! [`FieldDefinition`](super::FieldDefinition)).
//!
//! | kind | stored | external |
//! |---|---|---|
//! | `string`, `url` | string | string |
//! | `integer`, `duration` | integer | integer |
//! | `float` | number | number |
//! | `boolean` | bool | bool |
//! | `instant` | integer (Unix ns) | RFC 3339 string, UTC |
//! | `markup` | `{content, markup}` or string | `{content, markup}` |
//! | `user`, `iteration`, `area`, `codebase` | UUID string | UUID string |
//! | `workitem` | string or unsigned integer | string |

#![allow(clippy::module_name_repetitions)]

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value, json};
use url::Url;
use uuid::Uuid;

use super::kind::{FieldType, Kind};
use crate::error::ConversionError;

/// Markup language assumed when a stored markup value is a bare string.
pub const DEFAULT_MARKUP: &str = "PlainText";

impl FieldType {
    /// Convert a stored value into its external representation.
    ///
    /// Enum values are converted through their base kind only; a stored value
    /// that has since been dropped from the enum still converts.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] when the value does not match the kind.
    pub fn convert_from_model(&self, value: &Value) -> Result<Value, ConversionError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            Self::Simple(kind) | Self::Enum { base: kind, .. } => kind_from_model(*kind, value),
            Self::List { component } => map_list(value, |v| kind_from_model(*component, v)),
        }
    }

    /// Convert an external value into its stored representation.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] when the value does not match the kind or,
    /// for enums, is not one of the declared values.
    pub fn convert_to_model(&self, value: &Value) -> Result<Value, ConversionError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            Self::Simple(kind) => kind_to_model(*kind, value),
            Self::Enum { base, values } => {
                let converted = kind_to_model(*base, value)?;
                if values.iter().any(|v| same_value(*base, v, &converted)) {
                    Ok(converted)
                } else {
                    Err(ConversionError::InvalidValue {
                        kind: "enum",
                        reason: format!("{converted} is not one of {}", Value::from(values.clone())),
                    })
                }
            }
            Self::List { component } => map_list(value, |v| kind_to_model(*component, v)),
        }
    }
}

/// Enum membership test; numeric kinds compare by value so `1` matches `1.0`.
fn same_value(base: Kind, declared: &Value, candidate: &Value) -> bool {
    if declared == candidate {
        return true;
    }
    let numeric = matches!(base, Kind::Integer | Kind::Float | Kind::Duration);
    match (declared.as_f64(), candidate.as_f64()) {
        (Some(a), Some(b)) if numeric => a.to_bits() == b.to_bits(),
        _ => false,
    }
}

/// Name of a JSON value's shape, for mismatch messages.
const fn shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

const fn mismatch(expected: &'static str, value: &Value) -> ConversionError {
    ConversionError::KindMismatch {
        expected,
        found: shape(value),
    }
}

fn map_list(
    value: &Value,
    f: impl FnMut(&Value) -> Result<Value, ConversionError>,
) -> Result<Value, ConversionError> {
    let Value::Array(items) = value else {
        return Err(mismatch("array", value));
    };
    items
        .iter()
        .map(f)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn kind_from_model(kind: Kind, value: &Value) -> Result<Value, ConversionError> {
    match kind {
        Kind::Instant => {
            let nanos = value.as_i64().ok_or_else(|| mismatch("integer", value))?;
            Ok(Value::String(
                Utc.timestamp_nanos(nanos)
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ))
        }
        Kind::Markup => markup(value),
        Kind::WorkItem => match value {
            Value::String(s) if !s.is_empty() => Ok(value.clone()),
            Value::Number(n) if n.is_u64() => Ok(Value::String(n.to_string())),
            Value::String(_) => Err(ConversionError::InvalidValue {
                kind: "workitem",
                reason: "empty identifier".into(),
            }),
            _ => Err(mismatch("string", value)),
        },
        _ => check_plain(kind, value),
    }
}

fn kind_to_model(kind: Kind, value: &Value) -> Result<Value, ConversionError> {
    match kind {
        Kind::Instant => match value {
            Value::String(s) => {
                let parsed = DateTime::parse_from_rfc3339(s).map_err(|e| {
                    ConversionError::InvalidValue {
                        kind: "instant",
                        reason: e.to_string(),
                    }
                })?;
                parsed
                    .with_timezone(&Utc)
                    .timestamp_nanos_opt()
                    .map(Value::from)
                    .ok_or_else(|| ConversionError::InvalidValue {
                        kind: "instant",
                        reason: format!("{s} is outside the representable range"),
                    })
            }
            Value::Number(n) if n.is_i64() => Ok(value.clone()),
            _ => Err(mismatch("string", value)),
        },
        Kind::Url => {
            let url = check_plain(kind, value)?;
            let text = url.as_str().unwrap_or_default();
            Url::parse(text).map_err(|e| ConversionError::InvalidValue {
                kind: "url",
                reason: format!("{value} is not an absolute URL: {e}"),
            })?;
            Ok(url)
        }
        Kind::Markup => markup(value),
        Kind::WorkItem => kind_from_model(kind, value),
        _ => check_plain(kind, value),
    }
}

/// Kinds whose stored and external forms are identical once the shape is right.
fn check_plain(kind: Kind, value: &Value) -> Result<Value, ConversionError> {
    match kind {
        Kind::String | Kind::Url => value
            .is_string()
            .then(|| value.clone())
            .ok_or_else(|| mismatch("string", value)),
        Kind::Integer | Kind::Duration => (value.is_i64() || value.is_u64())
            .then(|| value.clone())
            .ok_or_else(|| mismatch("integer", value)),
        Kind::Float => value
            .is_number()
            .then(|| value.clone())
            .ok_or_else(|| mismatch("number", value)),
        Kind::Boolean => value
            .is_boolean()
            .then(|| value.clone())
            .ok_or_else(|| mismatch("boolean", value)),
        Kind::User | Kind::Iteration | Kind::Area | Kind::Codebase => {
            let s = value.as_str().ok_or_else(|| mismatch("string", value))?;
            let id = Uuid::parse_str(s).map_err(|e| ConversionError::InvalidValue {
                kind: kind.as_str(),
                reason: e.to_string(),
            })?;
            Ok(Value::String(id.to_string()))
        }
        Kind::Instant | Kind::Markup | Kind::WorkItem => kind_from_model(kind, value),
    }
}

fn markup(value: &Value) -> Result<Value, ConversionError> {
    match value {
        Value::String(content) => Ok(json!({ "content": content, "markup": DEFAULT_MARKUP })),
        Value::Object(map) => {
            let content = map
                .get("content")
                .and_then(Value::as_str)
                .ok_or_else(|| ConversionError::InvalidValue {
                    kind: "markup",
                    reason: "missing string 'content'".into(),
                })?;
            let language = match map.get("markup") {
                None | Some(Value::Null) => DEFAULT_MARKUP,
                Some(Value::String(m)) => m.as_str(),
                Some(other) => return Err(mismatch("string", other)),
            };
            let mut out = Map::new();
            out.insert("content".into(), Value::String(content.to_string()));
            out.insert("markup".into(), Value::String(language.to_string()));
            Ok(Value::Object(out))
        }
        _ => Err(mismatch("object", value)),
    }
}
