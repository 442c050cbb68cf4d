//! Declarative catalogs of types, link categories and link types.
//!
//! A catalog is a TOML document with three arrays of tables:
//!
//! ```toml
//! [[link_categories]]
//! id = "b1482c65-a64d-4058-beb0-62f7198cb0f4"
//! name = "system"
//!
//! [[types]]
//! id = "86af5178-9b41-469b-9096-57e5155c3f31"
//! name = "planneritem"
//!
//! [types.fields."system.title"]
//! label = "Title"
//! required = true
//! type = { kind = "string" }
//!
//! [[types]]
//! id = "26787039-b68f-4e28-8814-c2f93be1ef4e"
//! name = "bug"
//! parent = "planneritem"
//!
//! [[link_types]]
//! id = "aad2a4ad-d601-4104-9804-2c977ca2e0c1"
//! name = "Bug blocker"
//! source = "bug"
//! target = "bug"
//! forward_name = "blocks"
//! reverse_name = "blocked by"
//! topology = "network"
//! category = "system"
//! ```
//!
//! References (`parent`, `source`, `target`, `category`) accept either a
//! name or an identifier. Resolution orders types parent-first, computes
//! their paths, and layers each child's field definitions over those it
//! inherits.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::field::FieldSchema;
use crate::ident::SYSTEM_SPACE;
use crate::link::{WorkItemLinkCategory, WorkItemLinkType, check_valid_topology};
use crate::model::WorkItemType;
use crate::repo::{MemoryRepository, Repository};

const SYSTEM_CATALOG: &str = include_str!("../catalog/system.toml");

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    #[serde(default)]
    pub link_categories: Vec<CategoryDef>,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub link_types: Vec<LinkTypeDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryDef {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDef {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: String,
    /// Name or id of the parent type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub fields: FieldSchema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkTypeDef {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source: String,
    pub target: String,
    pub forward_name: String,
    pub reverse_name: String,
    pub topology: String,
    pub category: String,
    /// Defaults to the system space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<Uuid>,
}

impl TypeDef {
    fn build(&self, parent: Option<&WorkItemType>) -> WorkItemType {
        let mut wit = match parent {
            None => WorkItemType::new_root(self.id, &self.name, &self.icon),
            Some(parent) => WorkItemType::new_child(self.id, &self.name, &self.icon, parent),
        };
        wit.description.clone_from(&self.description);
        wit.fields = wit.fields.merged_with(&self.fields);
        wit
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Catalog {
    /// Parse a catalog document.
    ///
    /// # Errors
    ///
    /// Fails on TOML syntax errors, unknown keys, malformed identifiers and
    /// unsupported field kinds.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("Failed to parse catalog")
    }

    /// Overlay `other` on `self`.
    ///
    /// Entries of `other` replace entries of `self` with the same id; the
    /// rest are appended.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        merge_by_id(&mut self.link_categories, other.link_categories, |c| c.id);
        merge_by_id(&mut self.types, other.types, |t| t.id);
        merge_by_id(&mut self.link_types, other.link_types, |l| l.id);
        self
    }

    /// The system catalog, optionally overlaid with the catalog at `path`.
    ///
    /// # Errors
    ///
    /// Fails when either catalog cannot be loaded.
    pub fn layered(include_system: bool, path: Option<&Path>) -> anyhow::Result<Self> {
        let base = if include_system {
            system_catalog()?
        } else {
            Self::default()
        };
        match path {
            Some(path) => Ok(base.merge(load_catalog(path)?)),
            None => Ok(base),
        }
    }

    /// Validate every definition and build the engine records.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadParameter`] for duplicate ids or names,
    /// unknown references, parent cycles, and records that fail validation.
    pub fn resolve(&self) -> Result<ResolvedCatalog> {
        let link_categories = self.resolve_categories()?;
        let types = self.resolve_types()?;
        let link_types = self.resolve_link_types(&types, &link_categories)?;
        tracing::debug!(
            categories = link_categories.len(),
            types = types.len(),
            link_types = link_types.len(),
            "resolved catalog"
        );
        Ok(ResolvedCatalog {
            link_categories,
            types,
            link_types,
        })
    }

    fn resolve_categories(&self) -> Result<Vec<WorkItemLinkCategory>> {
        Index::build(
            "link_categories",
            self.link_categories.iter().map(|c| (c.id, c.name.as_str())),
        )?;
        self.link_categories
            .iter()
            .map(|def| {
                let category = WorkItemLinkCategory {
                    description: def.description.clone(),
                    ..WorkItemLinkCategory::new(def.id, &def.name)
                };
                category.check_valid_for_creation()?;
                Ok(category)
            })
            .collect()
    }

    fn resolve_types(&self) -> Result<Vec<WorkItemType>> {
        let index = Index::build("types", self.types.iter().map(|t| (t.id, t.name.as_str())))?;
        let parents = self
            .types
            .iter()
            .map(|def| match &def.parent {
                None => Ok(None),
                Some(reference) => index.lookup(reference).map(Some).ok_or_else(|| {
                    EngineError::bad_parameter(format!("types.{}.parent", def.name), reference)
                        .expected("a type name or id in the catalog")
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut resolved: Vec<Option<WorkItemType>> = vec![None; self.types.len()];
        let mut order = Vec::with_capacity(self.types.len());
        while order.len() < self.types.len() {
            let before = order.len();
            for (i, def) in self.types.iter().enumerate() {
                if resolved[i].is_some() {
                    continue;
                }
                let wit = match parents[i] {
                    None => def.build(None),
                    Some(p) => match &resolved[p] {
                        Some(parent) => def.build(Some(parent)),
                        None => continue,
                    },
                };
                wit.check_valid()?;
                resolved[i] = Some(wit);
                order.push(i);
            }
            if order.len() == before {
                let stuck = self
                    .types
                    .iter()
                    .enumerate()
                    .find_map(|(i, def)| resolved[i].is_none().then_some(def));
                if let Some(def) = stuck {
                    return Err(EngineError::bad_parameter(
                        format!("types.{}.parent", def.name),
                        def.parent.as_deref().unwrap_or_default(),
                    )
                    .expected("an acyclic parent chain"));
                }
            }
        }
        Ok(order.into_iter().filter_map(|i| resolved[i].take()).collect())
    }

    fn resolve_link_types(
        &self,
        types: &[WorkItemType],
        categories: &[WorkItemLinkCategory],
    ) -> Result<Vec<WorkItemLinkType>> {
        Index::build(
            "link_types",
            self.link_types.iter().map(|l| (l.id, l.name.as_str())),
        )?;
        let type_index = Index::build("types", types.iter().map(|t| (t.id, t.name.as_str())))?;
        let category_index = Index::build(
            "link_categories",
            categories.iter().map(|c| (c.id, c.name.as_str())),
        )?;

        self.link_types
            .iter()
            .map(|def| {
                let type_ref = |member: &str, reference: &str| {
                    type_index.lookup(reference).map(|i| types[i].id).ok_or_else(|| {
                        EngineError::bad_parameter(format!("link_types.{}.{member}", def.name), reference)
                            .expected("a type name or id in the catalog")
                    })
                };
                let source_type_id = type_ref("source", &def.source)?;
                let target_type_id = type_ref("target", &def.target)?;
                let link_category_id = category_index
                    .lookup(&def.category)
                    .map(|i| categories[i].id)
                    .ok_or_else(|| {
                        EngineError::bad_parameter(format!("link_types.{}.category", def.name), &def.category)
                            .expected("a link category name or id in the catalog")
                    })?;
                let link_type = WorkItemLinkType {
                    id: def.id,
                    name: def.name.clone(),
                    description: def.description.clone(),
                    topology: Some(check_valid_topology(&def.topology)?),
                    source_type_id,
                    target_type_id,
                    forward_name: def.forward_name.clone(),
                    reverse_name: def.reverse_name.clone(),
                    link_category_id,
                    space_id: def.space_id.unwrap_or(SYSTEM_SPACE),
                    ..WorkItemLinkType::default()
                };
                link_type.check_valid_for_creation()?;
                Ok(link_type)
            })
            .collect()
    }
}

/// The built-in catalog of system types and link types.
///
/// # Errors
///
/// Fails only if the embedded document is malformed.
pub fn system_catalog() -> anyhow::Result<Catalog> {
    Catalog::from_toml_str(SYSTEM_CATALOG).context("Failed to load the built-in system catalog")
}

/// Read and parse the catalog file at `path`.
///
/// # Errors
///
/// Fails when the file cannot be read or parsed.
pub fn load_catalog(path: &Path) -> anyhow::Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Catalog::from_toml_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn merge_by_id<T>(base: &mut Vec<T>, overlay: Vec<T>, id: impl Fn(&T) -> Uuid) {
    for entry in overlay {
        match base.iter_mut().find(|existing| id(existing) == id(&entry)) {
            Some(slot) => *slot = entry,
            None => base.push(entry),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved catalogs
// ---------------------------------------------------------------------------

/// Validated records, types in parent-first order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedCatalog {
    pub link_categories: Vec<WorkItemLinkCategory>,
    pub types: Vec<WorkItemType>,
    pub link_types: Vec<WorkItemLinkType>,
}

impl ResolvedCatalog {
    /// Find a type by name or id.
    #[must_use]
    pub fn find_type(&self, reference: &str) -> Option<&WorkItemType> {
        let id = Uuid::parse_str(reference).ok();
        self.types
            .iter()
            .find(|t| Some(t.id) == id || t.name == reference)
    }

    /// Find a link type by name or id.
    #[must_use]
    pub fn find_link_type(&self, reference: &str) -> Option<&WorkItemLinkType> {
        let id = Uuid::parse_str(reference).ok();
        self.link_types
            .iter()
            .find(|l| Some(l.id) == id || l.name == reference)
    }

    /// Seed an in-memory repository with every record.
    ///
    /// # Errors
    ///
    /// Propagates the first repository error; none is expected for a catalog
    /// produced by [`Catalog::resolve`].
    pub fn into_repository(self) -> Result<MemoryRepository> {
        let repo = MemoryRepository::new();
        for category in self.link_categories {
            repo.create_link_category(category)?;
        }
        for wit in self.types {
            repo.create_type(wit)?;
        }
        for link_type in self.link_types {
            repo.create_link_type(link_type)?;
        }
        Ok(repo)
    }
}

/// Id and name lookup over one catalog section; rejects duplicates.
struct Index<'a> {
    by_id: HashMap<Uuid, usize>,
    by_name: HashMap<&'a str, usize>,
}

impl<'a> Index<'a> {
    fn build(section: &str, entries: impl Iterator<Item = (Uuid, &'a str)>) -> Result<Self> {
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        for (i, (id, name)) in entries.enumerate() {
            if by_id.insert(id, i).is_some() {
                return Err(EngineError::bad_parameter(format!("{section}.id"), id)
                    .expected("a unique id"));
            }
            if by_name.insert(name, i).is_some() {
                return Err(EngineError::bad_parameter(format!("{section}.name"), name)
                    .expected("a unique name"));
            }
        }
        Ok(Self { by_id, by_name })
    }

    fn lookup(&self, reference: &str) -> Option<usize> {
        Uuid::parse_str(reference)
            .ok()
            .and_then(|id| self.by_id.get(&id))
            .or_else(|| self.by_name.get(reference))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::{LINK_TYPE_PARENTING, SYSTEM_CREATED_AT, SYSTEM_TITLE, SystemType};
    use crate::link::Topology;

    fn system() -> ResolvedCatalog {
        system_catalog()
            .expect("embedded catalog parses")
            .resolve()
            .expect("embedded catalog resolves")
    }

    #[test]
    fn system_catalog_defines_every_system_type() {
        let resolved = system();
        for system_type in SystemType::ALL {
            let wit = resolved
                .find_type(system_type.as_str())
                .expect("system type present");
            assert_eq!(wit.id, system_type.id());
            assert!(wit.is_type_or_subtype_of(&SystemType::PlannerItem.id()));
        }
        assert_eq!(resolved.types[0].id, SystemType::PlannerItem.id());
    }

    #[test]
    fn children_inherit_fields_and_paths() {
        let resolved = system();
        let bug = resolved.find_type("bug").expect("bug");
        assert_eq!(bug.path.depth(), 2);
        assert!(bug.fields.contains(SYSTEM_TITLE));
        assert!(bug.fields.contains(SYSTEM_CREATED_AT));
        let planner = resolved.find_type("planneritem").expect("planner");
        assert_eq!(bug.fields, planner.fields);
    }

    #[test]
    fn system_link_types_resolve_references() {
        let resolved = system();
        let parenting = resolved
            .find_link_type(&LINK_TYPE_PARENTING.to_string())
            .expect("parenting");
        assert_eq!(parenting.topology, Some(Topology::Tree));
        assert_eq!(parenting.source_type_id, SystemType::PlannerItem.id());
        let blocker = resolved.find_link_type("Bug blocker").expect("blocker");
        assert_eq!(blocker.source_type_id, SystemType::Bug.id());
        assert_eq!(blocker.space_id, SYSTEM_SPACE);
    }

    #[test]
    fn child_definitions_override_inherited_fields() {
        let overlay = Catalog::from_toml_str(
            r#"
[[types]]
id = "26787039-b68f-4e28-8814-c2f93be1ef4e"
name = "bug"
parent = "planneritem"

[types.fields."system.title"]
label = "Summary"
required = true
type = { kind = "string" }

[types.fields."severity"]
label = "Severity"
type = { kind = "enum", base_type = "string", values = ["low", "high"] }
"#,
        )
        .expect("overlay parses");
        let resolved = system_catalog()
            .expect("system")
            .merge(overlay)
            .resolve()
            .expect("resolves");
        let bug = resolved.find_type("bug").expect("bug");
        assert_eq!(bug.fields.get(SYSTEM_TITLE).map(|d| d.label.as_str()), Some("Summary"));
        assert!(bug.fields.contains("severity"));
        assert_eq!(resolved.types.len(), SystemType::ALL.len());
    }

    #[test]
    fn parent_cycles_are_rejected() {
        let catalog = Catalog::from_toml_str(
            r#"
[[types]]
id = "11111111-1111-1111-1111-111111111111"
name = "a"
parent = "b"

[[types]]
id = "22222222-2222-2222-2222-222222222222"
name = "b"
parent = "a"
"#,
        )
        .expect("parses");
        let err = catalog.resolve().expect_err("cycle");
        assert_eq!(err.field(), Some("types.a.parent"));
    }

    #[test]
    fn unknown_references_are_rejected() {
        let catalog = Catalog::from_toml_str(
            r#"
[[types]]
id = "11111111-1111-1111-1111-111111111111"
name = "a"
parent = "ghost"
"#,
        )
        .expect("parses");
        assert_eq!(catalog.resolve().expect_err("unknown").field(), Some("types.a.parent"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let catalog = Catalog::from_toml_str(
            r#"
[[types]]
id = "11111111-1111-1111-1111-111111111111"
name = "a"

[[types]]
id = "22222222-2222-2222-2222-222222222222"
name = "a"
"#,
        )
        .expect("parses");
        assert_eq!(catalog.resolve().expect_err("duplicate").field(), Some("types.name"));
    }

    #[test]
    fn bad_topology_is_rejected() {
        let mut catalog = system_catalog().expect("system");
        catalog.link_types[0].topology = "star".into();
        assert_eq!(catalog.resolve().expect_err("topology").field(), Some("topology"));
    }

    #[test]
    fn unknown_keys_fail_to_parse() {
        assert!(Catalog::from_toml_str("[[types]]\nid = \"11111111-1111-1111-1111-111111111111\"\nname = \"a\"\ncolour = \"red\"\n").is_err());
    }

    #[test]
    fn resolved_catalog_seeds_a_repository() {
        let repo = system().into_repository().expect("seeds");
        assert_eq!(repo.list_types().expect("types").len(), SystemType::ALL.len());
        assert_eq!(repo.list_link_types().expect("link types").len(), 3);
        assert_eq!(
            repo.list_subtypes(&SystemType::PlannerItem.id()).expect("subtypes").len(),
            SystemType::ALL.len() - 1
        );
    }
}
