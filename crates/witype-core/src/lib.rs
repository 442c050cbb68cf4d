//! witype-core library.
//!
//! Work item type taxonomy, per-type field schemas, and topology-constrained
//! link types.
//!
//! ## Modules
//!
//! - [`ident`]: well-known identifiers and path-segment sanitizing.
//! - [`field`]: field kinds, value conversion, and schemas.
//! - [`model`]: work item types and their path-encoded ancestry.
//! - [`link`]: link types, link categories, and topologies.
//! - [`convert`]: external document shapes for the API layer.
//! - [`repo`]: the persistence contract and an in-memory implementation.
//! - [`catalog`]: TOML catalogs and the built-in system catalog.
//! - [`config`]: project and user configuration.
//!
//! # Conventions
//!
//! - **Errors**: engine operations return [`error::Result`] with an
//!   [`error::EngineError`]; file loading uses `anyhow::Result` with context.
//! - **Logging**: `tracing` macros, `debug!` on writes only. The engine never
//!   logs an error it returns.

pub mod catalog;
pub mod config;
pub mod convert;
pub mod error;
pub mod field;
pub mod ident;
pub mod lifecycle;
pub mod link;
pub mod model;
pub mod repo;

pub use error::{ConversionError, EngineError, ErrorCode, Result};
