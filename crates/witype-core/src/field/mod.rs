//! Field schemas: the typed fields a work item type carries.
//!
//! ## Submodules
//!
//! - [`kind`]: field type descriptors (simple kinds, enums, lists).
//! - [`convert`]: per-kind conversion between stored and external values.
//! - [`schema`]: field definitions and the per-type schema map.

pub mod convert;
pub mod kind;
pub mod schema;

pub use kind::{FieldType, Kind};
pub use schema::{FieldDefinition, FieldSchema, FieldValues};
