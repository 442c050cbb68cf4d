//! Well-known identifiers and the path-segment encoding of identifiers.
//!
//! Every constant in this module is part of the persisted contract: stored
//! type paths embed these identifiers, so they must never change.
//!
//! # Sanitized identifiers
//!
//! A type path is a chain of identifiers joined by [`PATH_SEPARATOR`]. The
//! hyphenated textual form of a UUID is not a valid path label, so each
//! identifier is *sanitized* by replacing every `-` with `_` before it is
//! embedded. The mapping is injective over UUIDs because the hyphenated form
//! is canonical (lowercase, fixed positions).

use std::fmt;
use std::str::FromStr;

use uuid::{Uuid, uuid};

/// Separator between the segments of a type path.
pub const PATH_SEPARATOR: char = '.';

/// Return the path-segment-safe form of an identifier.
///
/// ```
/// use uuid::uuid;
/// use witype_core::ident::sanitized_id;
///
/// let id = uuid!("26787039-b68f-4e28-8814-c2f93be1ef4e");
/// assert_eq!(sanitized_id(&id), "26787039_b68f_4e28_8814_c2f93be1ef4e");
/// ```
#[must_use]
pub fn sanitized_id(id: &Uuid) -> String {
    id.hyphenated().to_string().replace('-', "_")
}

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

pub const SYSTEM_REMOTE_ITEM_ID: &str = "system.remote_item_id";
pub const SYSTEM_TITLE: &str = "system.title";
pub const SYSTEM_DESCRIPTION: &str = "system.description";
pub const SYSTEM_STATE: &str = "system.state";
pub const SYSTEM_ASSIGNEES: &str = "system.assignees";
pub const SYSTEM_CREATOR: &str = "system.creator";
/// Immutable creation timestamp; never part of the external representation.
pub const SYSTEM_CREATED_AT: &str = "system.created_at";
pub const SYSTEM_ITERATION: &str = "system.iteration";
pub const SYSTEM_AREA: &str = "system.area";
pub const SYSTEM_CODEBASE: &str = "system.codebase";

pub const SYSTEM_STATE_NEW: &str = "new";
pub const SYSTEM_STATE_OPEN: &str = "open";
pub const SYSTEM_STATE_IN_PROGRESS: &str = "in progress";
pub const SYSTEM_STATE_RESOLVED: &str = "resolved";
pub const SYSTEM_STATE_CLOSED: &str = "closed";

// ---------------------------------------------------------------------------
// Spaces, link categories, link types
// ---------------------------------------------------------------------------

/// The workspace that owns every system-defined record.
pub const SYSTEM_SPACE: Uuid = uuid!("2e0698d8-753e-4cef-bb7c-f027634824a2");

pub const LINK_CATEGORY_SYSTEM: Uuid = uuid!("b1482c65-a64d-4058-beb0-62f7198cb0f4");
pub const LINK_CATEGORY_USER: Uuid = uuid!("2f24724f-797c-4073-8b16-4bb8ce9e84a6");

pub const LINK_TYPE_BUG_BLOCKER: Uuid = uuid!("aad2a4ad-d601-4104-9804-2c977ca2e0c1");
pub const LINK_TYPE_RELATED_PLANNER_ITEM: Uuid = uuid!("9b631885-83b1-4c3f-a9c2-f7d2b23bd2ed");
pub const LINK_TYPE_PARENTING: Uuid = uuid!("25c326a7-6d03-4f5a-b23b-86a9ee4171e9");

pub const LINK_TYPE_BUG_BLOCKER_NAME: &str = "Bug blocker";
pub const LINK_TYPE_RELATED_PLANNER_ITEM_NAME: &str = "Related planner item";
pub const LINK_TYPE_PARENTING_NAME: &str = "Parenting";

// ---------------------------------------------------------------------------
// System work item types
// ---------------------------------------------------------------------------

/// The built-in work item types.
///
/// `PlannerItem` is the root that carries the fields common to all planner
/// types; every other variant is its direct child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemType {
    PlannerItem,
    UserStory,
    ValueProposition,
    Fundamental,
    Experience,
    Feature,
    Scenario,
    Bug,
}

impl SystemType {
    pub const ALL: [Self; 8] = [
        Self::PlannerItem,
        Self::UserStory,
        Self::ValueProposition,
        Self::Fundamental,
        Self::Experience,
        Self::Feature,
        Self::Scenario,
        Self::Bug,
    ];

    /// Stable identifier of the type.
    #[must_use]
    pub const fn id(self) -> Uuid {
        match self {
            Self::PlannerItem => uuid!("86af5178-9b41-469b-9096-57e5155c3f31"),
            Self::UserStory => uuid!("bbf35418-04b6-426c-a60b-7f80beb0b624"),
            Self::ValueProposition => uuid!("3194ab60-855b-4155-9005-9dce4a05f1eb"),
            Self::Fundamental => uuid!("ee7ca005-f81d-4eea-9b9b-1965df0988d0"),
            Self::Experience => uuid!("b9a71831-c803-4f66-8774-4193fffd1311"),
            Self::Feature => uuid!("0a24d3c2-e0a6-4686-8051-ec0ea1915a28"),
            Self::Scenario => uuid!("71171e90-6d35-498f-a6a7-2083b5267c18"),
            Self::Bug => uuid!("26787039-b68f-4e28-8814-c2f93be1ef4e"),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlannerItem => "planneritem",
            Self::UserStory => "userstory",
            Self::ValueProposition => "valueproposition",
            Self::Fundamental => "fundamental",
            Self::Experience => "experience",
            Self::Feature => "feature",
            Self::Scenario => "scenario",
            Self::Bug => "bug",
        }
    }

    /// Look a system type up by its identifier.
    #[must_use]
    pub fn from_id(id: &Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == *id)
    }

    /// Look a system type up by its name (exact match).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a name is not a system type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSystemType(pub String);

impl fmt::Display for UnknownSystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown system type: '{}'", self.0)
    }
}

impl std::error::Error for UnknownSystemType {}

impl FromStr for SystemType {
    type Err = UnknownSystemType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownSystemType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sanitized_id_replaces_every_hyphen() {
        let id = uuid!("11111111-1111-1111-1111-111111111111");
        assert_eq!(sanitized_id(&id), "11111111_1111_1111_1111_111111111111");
    }

    #[test]
    fn sanitized_id_is_lowercase_and_separator_free() {
        let id = Uuid::parse_str("0A24D3C2-E0A6-4686-8051-EC0EA1915A28").expect("valid uuid");
        let s = sanitized_id(&id);
        assert_eq!(s, "0a24d3c2_e0a6_4686_8051_ec0ea1915a28");
        assert!(!s.contains(PATH_SEPARATOR));
        assert!(!s.contains('-'));
    }

    #[test]
    fn system_type_ids_are_unique() {
        let ids: HashSet<Uuid> = SystemType::ALL.iter().map(|t| t.id()).collect();
        assert_eq!(ids.len(), SystemType::ALL.len());
    }

    #[test]
    fn system_type_name_roundtrips() {
        for t in SystemType::ALL {
            assert_eq!(SystemType::from_str(&t.to_string()), Ok(t));
            assert_eq!(SystemType::from_id(&t.id()), Some(t));
        }
        assert!(SystemType::from_str("epic").is_err());
        assert!(SystemType::from_str("Bug").is_err());
    }
}
