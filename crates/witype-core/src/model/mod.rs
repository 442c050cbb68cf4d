//! Work item types and their position in the type taxonomy.
//!
//! ## Submodules
//!
//! - [`path`]: path-encoded ancestry and subtype containment.
//! - [`work_item_type`]: the type entity, its validation and partial updates.
//! - [`work_item`]: the transient work item record used by the converter.

pub mod path;
pub mod work_item;
pub mod work_item_type;

pub use path::TypePath;
pub use work_item::WorkItem;
pub use work_item_type::{WorkItemType, WorkItemTypePatch};
