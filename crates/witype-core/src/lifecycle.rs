use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation, update, and soft-deletion timestamps shared by every record.
///
/// The engine treats these as opaque values: they take part in equality but
/// carry no invariants of their own. The persistence layer stamps them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Lifecycle {
    /// A lifecycle created and last updated at `now`.
    #[must_use]
    pub const fn created(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Copy of `self` with `updated_at` moved to `now`.
    #[must_use]
    pub const fn touched(self, now: DateTime<Utc>) -> Self {
        Self {
            updated_at: now,
            ..self
        }
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::Lifecycle;
    use chrono::{TimeZone, Utc};

    #[test]
    fn touched_keeps_creation_time() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid time");
        let t1 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).single().expect("valid time");
        let lc = Lifecycle::created(t0).touched(t1);
        assert_eq!(lc.created_at, t0);
        assert_eq!(lc.updated_at, t1);
        assert!(!lc.is_deleted());
    }

    #[test]
    fn default_lifecycles_compare_equal() {
        assert_eq!(Lifecycle::default(), Lifecycle::default());
    }
}
