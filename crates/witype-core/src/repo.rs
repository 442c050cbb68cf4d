//! Persistence contract for types, link types and link categories.
//!
//! The engine itself is pure; everything stateful goes through
//! [`Repository`]. Updates use optimistic concurrency: a caller presents the
//! version it read, and a save succeeds only if that is still the stored
//! version. A successful save bumps the version by one. Nothing here retries.
//!
//! [`MemoryRepository`] is the in-process implementation. Every table sits
//! behind its own [`RwLock`], and the version comparison and the write happen
//! under a single write guard, so concurrent savers of the same record see
//! exactly one winner.
//!
//! # Paths are write-once
//!
//! A type's path is fixed at creation and [`Repository::save_type`] refuses to
//! change it. An implementation that ever supports moving a type must
//! recompute the path of that type and of every descendant in the same
//! transaction, or subtype queries will silently go stale.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{EngineError, LINK_CATEGORY_ENTITY, LINK_TYPE_ENTITY, Result, TYPE_ENTITY};
use crate::lifecycle::Lifecycle;
use crate::link::{WorkItemLinkCategory, WorkItemLinkType, WorkItemLinkTypePatch};
use crate::model::{WorkItemType, WorkItemTypePatch};

/// Load/save operations the engine needs from a store.
pub trait Repository {
    /// # Errors
    ///
    /// [`EngineError::NotFound`] when no type has this id.
    fn load_type(&self, id: &Uuid) -> Result<WorkItemType>;

    /// Validate and insert a new type at version 0.
    ///
    /// # Errors
    ///
    /// [`EngineError::BadParameter`] for an invalid record or a path naming
    /// an ancestor that is not stored, [`EngineError::AlreadyExists`] for a
    /// duplicate id.
    fn create_type(&self, wit: WorkItemType) -> Result<WorkItemType>;

    /// Replace a stored type if `wit.version` is the stored version.
    ///
    /// # Errors
    ///
    /// [`EngineError::VersionConflict`] on a stale version,
    /// [`EngineError::NotFound`] for an unknown id, and
    /// [`EngineError::BadParameter`] for an invalid record or a changed path.
    fn save_type(&self, wit: WorkItemType) -> Result<WorkItemType>;

    /// # Errors
    ///
    /// Only on store failure.
    fn list_types(&self) -> Result<Vec<WorkItemType>>;

    /// # Errors
    ///
    /// [`EngineError::NotFound`] when no link type has this id.
    fn load_link_type(&self, id: &Uuid) -> Result<WorkItemLinkType>;

    /// Validate and insert a new link type at version 0.
    ///
    /// # Errors
    ///
    /// [`EngineError::BadParameter`] for an invalid record,
    /// [`EngineError::NotFound`] when the source type, target type or
    /// category is not stored, [`EngineError::AlreadyExists`] for a duplicate
    /// id.
    fn create_link_type(&self, link_type: WorkItemLinkType) -> Result<WorkItemLinkType>;

    /// Replace a stored link type if `link_type.version` is the stored one.
    ///
    /// # Errors
    ///
    /// As for [`save_type`](Self::save_type).
    fn save_link_type(&self, link_type: WorkItemLinkType) -> Result<WorkItemLinkType>;

    /// # Errors
    ///
    /// Only on store failure.
    fn list_link_types(&self) -> Result<Vec<WorkItemLinkType>>;

    /// # Errors
    ///
    /// [`EngineError::NotFound`] when no category has this id.
    fn load_link_category(&self, id: &Uuid) -> Result<WorkItemLinkCategory>;

    /// # Errors
    ///
    /// [`EngineError::BadParameter`] for an invalid record,
    /// [`EngineError::AlreadyExists`] for a duplicate id.
    fn create_link_category(&self, category: WorkItemLinkCategory) -> Result<WorkItemLinkCategory>;

    /// # Errors
    ///
    /// Only on store failure.
    fn list_link_categories(&self) -> Result<Vec<WorkItemLinkCategory>>;

    /// Strict descendants of `ancestor`, answered from stored paths.
    ///
    /// # Errors
    ///
    /// Only on store failure.
    fn list_subtypes(&self, ancestor: &Uuid) -> Result<Vec<WorkItemType>> {
        Ok(self
            .list_types()?
            .into_iter()
            .filter(|wit| wit.path.has_ancestor(ancestor))
            .collect())
    }

    /// Load, merge `patch`, and save.
    ///
    /// The patch must carry the version the caller read; without one the
    /// loaded version is used, which makes the update last-writer-wins.
    ///
    /// # Errors
    ///
    /// Any error of [`load_type`](Self::load_type),
    /// [`WorkItemType::apply_patch`] or [`save_type`](Self::save_type).
    fn update_type(&self, id: &Uuid, patch: &WorkItemTypePatch) -> Result<WorkItemType> {
        let current = self.load_type(id)?;
        self.save_type(current.apply_patch(patch)?)
    }

    /// Load, merge `patch`, and save.
    ///
    /// # Errors
    ///
    /// Any error of [`load_link_type`](Self::load_link_type),
    /// [`WorkItemLinkType::apply_patch`] or
    /// [`save_link_type`](Self::save_link_type).
    fn update_link_type(&self, id: &Uuid, patch: &WorkItemLinkTypePatch) -> Result<WorkItemLinkType> {
        let current = self.load_link_type(id)?;
        self.save_link_type(current.apply_patch(patch)?)
    }
}

// ---------------------------------------------------------------------------
// Versioned tables
// ---------------------------------------------------------------------------

/// What a table needs to know about the records it stores.
trait Record: Clone {
    const ENTITY: &'static str;

    fn id(&self) -> Uuid;
    fn version(&self) -> u32;
    fn set_version(&mut self, version: u32);
    fn lifecycle_mut(&mut self) -> &mut Lifecycle;
    fn lifecycle(&self) -> Lifecycle;
}

macro_rules! impl_record {
    ($ty:ty, $entity:expr) => {
        impl Record for $ty {
            const ENTITY: &'static str = $entity;

            fn id(&self) -> Uuid {
                self.id
            }

            fn version(&self) -> u32 {
                self.version
            }

            fn set_version(&mut self, version: u32) {
                self.version = version;
            }

            fn lifecycle_mut(&mut self) -> &mut Lifecycle {
                &mut self.lifecycle
            }

            fn lifecycle(&self) -> Lifecycle {
                self.lifecycle
            }
        }
    };
}

impl_record!(WorkItemType, TYPE_ENTITY);
impl_record!(WorkItemLinkType, LINK_TYPE_ENTITY);
impl_record!(WorkItemLinkCategory, LINK_CATEGORY_ENTITY);

struct Table<T> {
    rows: RwLock<BTreeMap<Uuid, T>>,
}

impl<T: Record> Table<T> {
    const fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    fn get(&self, id: &Uuid) -> Result<T> {
        let rows = self.rows.read().map_err(|_| EngineError::StorePoisoned)?;
        rows.get(id).cloned().ok_or_else(|| EngineError::NotFound {
            entity: T::ENTITY,
            id: id.to_string(),
        })
    }

    fn contains(&self, id: &Uuid) -> Result<bool> {
        let rows = self.rows.read().map_err(|_| EngineError::StorePoisoned)?;
        Ok(rows.contains_key(id))
    }

    fn all(&self) -> Result<Vec<T>> {
        let rows = self.rows.read().map_err(|_| EngineError::StorePoisoned)?;
        Ok(rows.values().cloned().collect())
    }

    fn insert_new(&self, mut record: T, now: DateTime<Utc>) -> Result<T> {
        let mut rows = self.rows.write().map_err(|_| EngineError::StorePoisoned)?;
        let id = record.id();
        if rows.contains_key(&id) {
            return Err(EngineError::AlreadyExists {
                entity: T::ENTITY,
                id,
            });
        }
        *record.lifecycle_mut() = Lifecycle::created(now);
        record.set_version(0);
        rows.insert(id, record.clone());
        tracing::debug!(entity = T::ENTITY, %id, "created");
        Ok(record)
    }

    /// Compare the presented version with the stored one and swap on match.
    ///
    /// `check` sees the stored record and the candidate under the write
    /// guard.
    fn compare_and_swap(
        &self,
        mut record: T,
        now: DateTime<Utc>,
        check: impl FnOnce(&T, &T) -> Result<()>,
    ) -> Result<T> {
        let mut rows = self.rows.write().map_err(|_| EngineError::StorePoisoned)?;
        let id = record.id();
        let stored = rows.get(&id).ok_or_else(|| EngineError::NotFound {
            entity: T::ENTITY,
            id: id.to_string(),
        })?;
        if stored.version() != record.version() {
            return Err(EngineError::VersionConflict {
                entity: T::ENTITY,
                id,
                expected: record.version(),
                actual: stored.version(),
            });
        }
        check(stored, &record)?;
        let version = stored.version().checked_add(1).ok_or_else(|| {
            EngineError::bad_parameter("version", stored.version())
                .expected(format!("a version below {}", u32::MAX))
        })?;
        *record.lifecycle_mut() = stored.lifecycle().touched(now);
        record.set_version(version);
        rows.insert(id, record.clone());
        tracing::debug!(entity = T::ENTITY, %id, version, "saved");
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// In-memory repository
// ---------------------------------------------------------------------------

/// Thread-safe in-memory [`Repository`].
pub struct MemoryRepository {
    types: Table<WorkItemType>,
    link_types: Table<WorkItemLinkType>,
    link_categories: Table<WorkItemLinkCategory>,
    clock: fn() -> DateTime<Utc>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRepository").finish_non_exhaustive()
    }
}

impl MemoryRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// A repository that stamps lifecycles from `clock`.
    #[must_use]
    pub const fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        Self {
            types: Table::new(),
            link_types: Table::new(),
            link_categories: Table::new(),
            clock,
        }
    }

    fn require_ancestors(&self, wit: &WorkItemType) -> Result<()> {
        let ancestors: Vec<&str> = wit.path.ancestor_segments().collect();
        if ancestors.is_empty() {
            return Ok(());
        }
        let known: HashSet<String> = self
            .types
            .all()?
            .iter()
            .map(WorkItemType::sanitized_id)
            .collect();
        match ancestors.into_iter().find(|segment| !known.contains(*segment)) {
            Some(missing) => Err(EngineError::bad_parameter("path", &wit.path)
                .expected(format!("a stored ancestor for segment {missing}"))),
            None => Ok(()),
        }
    }

    fn require_type(&self, id: &Uuid) -> Result<()> {
        if self.types.contains(id)? {
            Ok(())
        } else {
            Err(EngineError::NotFound {
                entity: TYPE_ENTITY,
                id: id.to_string(),
            })
        }
    }
}

impl Repository for MemoryRepository {
    fn load_type(&self, id: &Uuid) -> Result<WorkItemType> {
        self.types.get(id)
    }

    fn create_type(&self, wit: WorkItemType) -> Result<WorkItemType> {
        wit.check_valid()?;
        self.require_ancestors(&wit)?;
        self.types.insert_new(wit, (self.clock)())
    }

    fn save_type(&self, wit: WorkItemType) -> Result<WorkItemType> {
        wit.check_valid()?;
        self.types.compare_and_swap(wit, (self.clock)(), |stored, candidate| {
            if stored.path == candidate.path {
                Ok(())
            } else {
                Err(EngineError::bad_parameter("path", &candidate.path)
                    .expected(stored.path.to_string()))
            }
        })
    }

    fn list_types(&self) -> Result<Vec<WorkItemType>> {
        self.types.all()
    }

    fn load_link_type(&self, id: &Uuid) -> Result<WorkItemLinkType> {
        self.link_types.get(id)
    }

    fn create_link_type(&self, link_type: WorkItemLinkType) -> Result<WorkItemLinkType> {
        if link_type.id.is_nil() {
            return Err(EngineError::bad_parameter("id", link_type.id));
        }
        link_type.check_valid_for_creation()?;
        self.require_type(&link_type.source_type_id)?;
        self.require_type(&link_type.target_type_id)?;
        self.link_categories.get(&link_type.link_category_id)?;
        self.link_types.insert_new(link_type, (self.clock)())
    }

    fn save_link_type(&self, link_type: WorkItemLinkType) -> Result<WorkItemLinkType> {
        link_type.check_valid_for_creation()?;
        self.require_type(&link_type.source_type_id)?;
        self.require_type(&link_type.target_type_id)?;
        self.link_categories.get(&link_type.link_category_id)?;
        self.link_types
            .compare_and_swap(link_type, (self.clock)(), |_, _| Ok(()))
    }

    fn list_link_types(&self) -> Result<Vec<WorkItemLinkType>> {
        self.link_types.all()
    }

    fn load_link_category(&self, id: &Uuid) -> Result<WorkItemLinkCategory> {
        self.link_categories.get(id)
    }

    fn create_link_category(&self, category: WorkItemLinkCategory) -> Result<WorkItemLinkCategory> {
        category.check_valid_for_creation()?;
        self.link_categories.insert_new(category, (self.clock)())
    }

    fn list_link_categories(&self) -> Result<Vec<WorkItemLinkCategory>> {
        self.link_categories.all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::ident::{LINK_CATEGORY_SYSTEM, SYSTEM_SPACE};
    use crate::link::Topology;
    use crate::model::TypePath;
    use chrono::TimeZone;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn seeded() -> (MemoryRepository, WorkItemType, WorkItemType) {
        let repo = MemoryRepository::with_clock(fixed_clock);
        let root = repo
            .create_type(WorkItemType::new_root(Uuid::new_v4(), "planneritem", ""))
            .expect("root");
        let child = repo
            .create_type(WorkItemType::new_child(Uuid::new_v4(), "bug", "", &root))
            .expect("child");
        (repo, root, child)
    }

    #[test]
    fn create_stamps_version_and_lifecycle() {
        let (repo, root, _) = seeded();
        assert_eq!(root.version, 0);
        assert_eq!(root.lifecycle.created_at, fixed_clock());
        assert_eq!(repo.load_type(&root.id).expect("stored"), root);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let (repo, root, _) = seeded();
        let err = repo.create_type(root).expect_err("duplicate");
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
    }

    #[test]
    fn orphan_paths_are_rejected() {
        let repo = MemoryRepository::new();
        let id = Uuid::new_v4();
        let mut orphan = WorkItemType::new_root(id, "orphan", "");
        orphan.path = TypePath::root(&Uuid::new_v4()).child(&id);
        let err = repo.create_type(orphan).expect_err("missing ancestor");
        assert_eq!(err.field(), Some("path"));
    }

    #[test]
    fn stale_save_conflicts() {
        let (repo, root, _) = seeded();
        let mut first = root.clone();
        first.icon = "fa fa-a".into();
        let saved = repo.save_type(first).expect("first save");
        assert_eq!(saved.version, 1);

        let mut second = root;
        second.icon = "fa fa-b".into();
        let err = repo.save_type(second).expect_err("stale");
        assert!(matches!(
            err,
            EngineError::VersionConflict {
                expected: 0,
                actual: 1,
                ..
            }
        ));
        assert_eq!(repo.load_type(&saved.id).expect("stored").icon, "fa fa-a");
    }

    #[test]
    fn save_cannot_move_a_type() {
        let (repo, root, child) = seeded();
        let mut moved = child;
        moved.path = TypePath::root(&moved.id);
        let err = repo.save_type(moved).expect_err("reparent");
        assert_eq!(err.field(), Some("path"));
        assert_eq!(repo.list_subtypes(&root.id).expect("list").len(), 1);
    }

    #[test]
    fn update_type_merges_and_bumps() {
        let (repo, _, child) = seeded();
        let patch = WorkItemTypePatch {
            description: Some("defects".into()),
            version: Some(0),
            ..WorkItemTypePatch::default()
        };
        let updated = repo.update_type(&child.id, &patch).expect("update");
        assert_eq!(updated.version, 1);
        assert_eq!(updated.description.as_deref(), Some("defects"));
        assert_eq!(updated.name, child.name);
        let err = repo.update_type(&child.id, &patch).expect_err("stale");
        assert_eq!(err.code(), ErrorCode::VersionConflict);
    }

    #[test]
    fn link_type_requires_known_endpoints() {
        let (repo, root, child) = seeded();
        let mut link_type = WorkItemLinkType {
            id: Uuid::new_v4(),
            name: "Parenting".into(),
            topology: Some(Topology::Tree),
            source_type_id: root.id,
            target_type_id: child.id,
            forward_name: "parent of".into(),
            reverse_name: "child of".into(),
            link_category_id: LINK_CATEGORY_SYSTEM,
            space_id: SYSTEM_SPACE,
            ..WorkItemLinkType::default()
        };
        let err = repo.create_link_type(link_type.clone()).expect_err("no category");
        assert_eq!(err.code(), ErrorCode::LinkCategoryNotFound);

        repo.create_link_category(WorkItemLinkCategory::new(LINK_CATEGORY_SYSTEM, "system"))
            .expect("category");
        link_type.target_type_id = Uuid::new_v4();
        let err = repo.create_link_type(link_type.clone()).expect_err("no target");
        assert_eq!(err.code(), ErrorCode::TypeNotFound);

        link_type.target_type_id = child.id;
        let created = repo.create_link_type(link_type).expect("valid");
        let patch = WorkItemLinkTypePatch {
            topology: Some(Topology::Dependency),
            version: Some(0),
            ..WorkItemLinkTypePatch::default()
        };
        let updated = repo.update_link_type(&created.id, &patch).expect("update");
        assert_eq!(updated.topology, Some(Topology::Dependency));
        assert_eq!(updated.version, 1);
    }

    #[test]
    fn link_type_with_nil_id_is_rejected() {
        let (repo, root, child) = seeded();
        repo.create_link_category(WorkItemLinkCategory::new(LINK_CATEGORY_SYSTEM, "system"))
            .expect("category");
        let link_type = WorkItemLinkType {
            name: "Related".into(),
            topology: Some(Topology::Network),
            source_type_id: root.id,
            target_type_id: child.id,
            forward_name: "relates to".into(),
            reverse_name: "related to".into(),
            link_category_id: LINK_CATEGORY_SYSTEM,
            space_id: SYSTEM_SPACE,
            ..WorkItemLinkType::default()
        };
        let err = repo.create_link_type(link_type).expect_err("nil id");
        assert_eq!(err.field(), Some("id"));
        assert!(repo.list_link_types().expect("list").is_empty());
    }

    #[test]
    fn exhausted_version_is_not_wrapped() {
        let (repo, root, _) = seeded();
        repo.types
            .rows
            .write()
            .expect("write guard")
            .get_mut(&root.id)
            .expect("stored root")
            .version = u32::MAX;

        let mut candidate = root.clone();
        candidate.version = u32::MAX;
        candidate.icon = "fa fa-x".into();
        let err = repo.save_type(candidate).expect_err("overflow");
        assert_eq!(err.field(), Some("version"));
        let stored = repo.load_type(&root.id).expect("stored");
        assert_eq!(stored.version, u32::MAX);
        assert_eq!(stored.icon, root.icon);
    }

    #[test]
    fn missing_records_report_not_found() {
        let repo = MemoryRepository::new();
        let id = Uuid::new_v4();
        assert_eq!(repo.load_type(&id).expect_err("absent").code(), ErrorCode::TypeNotFound);
        assert_eq!(
            repo.load_link_type(&id).expect_err("absent").code(),
            ErrorCode::LinkTypeNotFound
        );
    }
}
