//! Graph-shape declarations carried by link types.
//!
//! The engine validates and exposes these shapes; it never walks the work
//! item graph itself. Collaborators that create links use
//! [`Topology::is_directed`], [`Topology::permits_cycles`] and
//! [`Topology::max_incoming`] to decide whether a new link is acceptable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Acceptable topology literals, as shown in validation errors.
pub const TOPOLOGY_LITERALS: &str = "network|directed_network|dependency|tree";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Undirected; cycles allowed.
    Network,
    /// Directed; cycles allowed.
    DirectedNetwork,
    /// Directed and acyclic.
    Dependency,
    /// Directed, acyclic, at most one parent per item.
    Tree,
}

impl Topology {
    pub const ALL: [Self; 4] = [
        Self::Network,
        Self::DirectedNetwork,
        Self::Dependency,
        Self::Tree,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::DirectedNetwork => "directed_network",
            Self::Dependency => "dependency",
            Self::Tree => "tree",
        }
    }

    #[must_use]
    pub const fn is_directed(self) -> bool {
        !matches!(self, Self::Network)
    }

    #[must_use]
    pub const fn permits_cycles(self) -> bool {
        matches!(self, Self::Network | Self::DirectedNetwork)
    }

    /// Upper bound on incoming links of this type per work item.
    #[must_use]
    pub const fn max_incoming(self) -> Option<usize> {
        match self {
            Self::Tree => Some(1),
            _ => None,
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topology {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        check_valid_topology(s)
    }
}

/// Parse a topology literal.
///
/// Matching is exact: no trimming and no case folding.
///
/// # Errors
///
/// Returns [`EngineError::BadParameter`] on field `topology` listing the
/// acceptable literals.
pub fn check_valid_topology(value: &str) -> Result<Topology> {
    Topology::ALL
        .into_iter()
        .find(|t| t.as_str() == value)
        .ok_or_else(|| EngineError::bad_parameter("topology", value).expected(TOPOLOGY_LITERALS))
}
