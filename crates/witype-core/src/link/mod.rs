//! Link types: typed, topology-constrained edges between work item types.
//!
//! ## Submodules
//!
//! - [`topology`]: graph-shape declarations and their validation.
//! - [`link_type`]: the link type entity and its creation rules.
//! - [`category`]: link categories grouping related link types.

pub mod category;
pub mod link_type;
pub mod topology;

pub use category::WorkItemLinkCategory;
pub use link_type::{WorkItemLinkType, WorkItemLinkTypePatch};
pub use topology::{Topology, check_valid_topology};
