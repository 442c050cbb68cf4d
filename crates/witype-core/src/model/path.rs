//! Path-encoded ancestry of work item types.
//!
//! A [`TypePath`] is the chain of sanitized identifiers from the taxonomy
//! root down to and including the type itself, joined by
//! [`PATH_SEPARATOR`]:
//!
//! ```text
//! 86af5178_9b41_469b_9096_57e5155c3f31.26787039_b68f_4e28_8814_c2f93be1ef4e
//! └──────────── planneritem ─────────┘ └──────────────── bug ─────────────┘
//! ```
//!
//! Ancestry queries are string-only: no lookup of the ancestors is needed.
//! The price is that a path is only as accurate as the write that computed
//! it. Paths are write-once here; a collaborator that ever moves a type must
//! recompute the path of that type and, transitively, of every descendant.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ident::{PATH_SEPARATOR, sanitized_id};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypePath(String);

impl TypePath {
    /// Path of a type with no parent.
    #[must_use]
    pub fn root(id: &Uuid) -> Self {
        Self(sanitized_id(id))
    }

    /// Path of a direct child of the type at `self`.
    #[must_use]
    pub fn child(&self, id: &Uuid) -> Self {
        Self(format!("{}{PATH_SEPARATOR}{}", self.0, sanitized_id(id)))
    }

    /// Same ancestry, with the final segment naming `id` instead.
    #[must_use]
    pub fn with_own_id(&self, id: &Uuid) -> Self {
        self.0.rfind(PATH_SEPARATOR).map_or_else(
            || Self::root(id),
            |pos| Self(format!("{}{PATH_SEPARATOR}{}", &self.0[..pos], sanitized_id(id))),
        )
    }

    /// Wrap an already-computed path, e.g. one loaded from storage.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(PATH_SEPARATOR)
    }

    /// Number of segments, i.e. 1 for a root type.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.0.is_empty() {
            0
        } else {
            self.segments().count()
        }
    }

    /// Every segment except the last one, root first.
    pub fn ancestor_segments(&self) -> impl Iterator<Item = &str> {
        let own = self.0.rfind(PATH_SEPARATOR).map_or("", |pos| &self.0[..pos]);
        own.split(PATH_SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Sanitized identifier of the direct parent, if any.
    #[must_use]
    pub fn parent_segment(&self) -> Option<&str> {
        self.ancestor_segments().last()
    }

    /// True when the final segment is the sanitized form of `id`.
    #[must_use]
    pub fn ends_with(&self, id: &Uuid) -> bool {
        self.segments().last() == Some(sanitized_id(id).as_str())
    }

    /// True when `id` names a strict ancestor in this path.
    ///
    /// The match is anchored on whole segments: the candidate's sanitized
    /// identifier must be an entire segment that is followed by the
    /// separator. A sanitized identifier that merely occurs inside another
    /// segment (as a prefix, suffix, or infix) never matches.
    #[must_use]
    pub fn has_ancestor(&self, id: &Uuid) -> bool {
        let needle = sanitized_id(id);
        self.ancestor_segments().any(|segment| segment == needle)
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
