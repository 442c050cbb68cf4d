//! Conversion between engine records and their external document shapes.
//!
//! Documents follow a resource-object layout: `data` carries the `type`
//! discriminator, the `id`, an `attributes` object and a `relationships`
//! object whose members reference other records by identifier only. Every
//! member is optional so a document can describe a partial update.
//!
//! Conversion into the model never mutates the stored record. It merges the
//! members that are present onto a copy and re-validates the result.

#![allow(clippy::module_name_repetitions)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::field::{FieldSchema, FieldValues};
use crate::link::{WorkItemLinkType, WorkItemLinkTypePatch, check_valid_topology};
use crate::model::{WorkItem, WorkItemType, WorkItemTypePatch};

pub const WORK_ITEM_TYPES: &str = "workitemtypes";
pub const WORK_ITEM_LINK_TYPES: &str = "workitemlinktypes";
pub const WORK_ITEM_LINK_CATEGORIES: &str = "workitemlinkcategories";
pub const SPACES: &str = "spaces";

// ---------------------------------------------------------------------------
// Document shapes
// ---------------------------------------------------------------------------

/// Reference to another record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationData {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RelationData>,
}

impl Relation {
    fn to(kind: &str, id: Uuid) -> Option<Self> {
        Some(Self {
            data: Some(RelationData {
                kind: kind.to_string(),
                id,
            }),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkTypeDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<LinkTypeData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkTypeData {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<LinkTypeAttributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<LinkTypeRelationships>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkTypeAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse_name: Option<String>,
    /// Kept as text so unknown literals reach topology validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkTypeRelationships {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_category: Option<Relation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<Relation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<Relation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space: Option<Relation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkItemTypeDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<WorkItemTypeData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkItemTypeData {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<WorkItemTypeAttributes>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkItemTypeAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Read-only; ignored when converting into the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// External form of a work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemResource {
    pub id: String,
    #[serde(rename = "type")]
    pub type_id: Uuid,
    pub version: u32,
    pub fields: FieldValues,
}

// ---------------------------------------------------------------------------
// Link types
// ---------------------------------------------------------------------------

#[must_use]
pub fn link_type_from_model(link_type: &WorkItemLinkType) -> LinkTypeDocument {
    LinkTypeDocument {
        data: Some(LinkTypeData {
            kind: WORK_ITEM_LINK_TYPES.to_string(),
            id: Some(link_type.id),
            attributes: Some(LinkTypeAttributes {
                name: Some(link_type.name.clone()),
                description: link_type.description.clone(),
                version: Some(link_type.version),
                forward_name: Some(link_type.forward_name.clone()),
                reverse_name: Some(link_type.reverse_name.clone()),
                topology: link_type.topology.map(|t| t.as_str().to_string()),
                created_at: Some(link_type.lifecycle.created_at),
                updated_at: Some(link_type.lifecycle.updated_at),
            }),
            relationships: Some(LinkTypeRelationships {
                link_category: Relation::to(WORK_ITEM_LINK_CATEGORIES, link_type.link_category_id),
                source_type: Relation::to(WORK_ITEM_TYPES, link_type.source_type_id),
                target_type: Relation::to(WORK_ITEM_TYPES, link_type.target_type_id),
                space: Relation::to(SPACES, link_type.space_id),
            }),
        }),
    }
}

/// Merge an incoming document onto `current`.
///
/// Only `data` is mandatory. Present names must be non-empty, a present
/// topology must be a known literal, and the merged record must pass
/// [`WorkItemLinkType::check_valid_for_creation`].
///
/// # Errors
///
/// Returns [`EngineError::BadParameter`] naming the offending document
/// member, or the attribute that failed re-validation.
pub fn link_type_to_model(
    document: &LinkTypeDocument,
    current: &WorkItemLinkType,
) -> Result<WorkItemLinkType> {
    let data = document
        .data
        .as_ref()
        .ok_or_else(|| EngineError::bad_parameter("data", "null").expected("not null"))?;

    let mut base = current.clone();
    if let Some(id) = data.id {
        base.id = adopt_id(current.id, id)?;
    }

    let mut patch = WorkItemLinkTypePatch::default();
    if let Some(attrs) = &data.attributes {
        patch.name = non_empty("data.attributes.name", attrs.name.as_ref())?;
        patch.description.clone_from(&attrs.description);
        patch.version = attrs.version;
        patch.forward_name = non_empty("data.attributes.forward_name", attrs.forward_name.as_ref())?;
        patch.reverse_name = non_empty("data.attributes.reverse_name", attrs.reverse_name.as_ref())?;
        patch.topology = attrs
            .topology
            .as_deref()
            .map(check_valid_topology)
            .transpose()?;
    }
    if let Some(rels) = &data.relationships {
        patch.link_category_id =
            relation_id("link_category", rels.link_category.as_ref(), WORK_ITEM_LINK_CATEGORIES)?;
        patch.source_type_id = relation_id("source_type", rels.source_type.as_ref(), WORK_ITEM_TYPES)?;
        patch.target_type_id = relation_id("target_type", rels.target_type.as_ref(), WORK_ITEM_TYPES)?;
        patch.space_id = relation_id("space", rels.space.as_ref(), SPACES)?;
    }
    base.apply_patch(&patch)
}

// ---------------------------------------------------------------------------
// Work item types
// ---------------------------------------------------------------------------

#[must_use]
pub fn work_item_type_from_model(wit: &WorkItemType) -> WorkItemTypeDocument {
    WorkItemTypeDocument {
        data: Some(WorkItemTypeData {
            kind: WORK_ITEM_TYPES.to_string(),
            id: Some(wit.id),
            attributes: Some(WorkItemTypeAttributes {
                name: Some(wit.name.clone()),
                description: wit.description.clone(),
                icon: Some(wit.icon.clone()),
                version: Some(wit.version),
                path: Some(wit.path.to_string()),
                fields: Some(wit.fields.clone()),
                created_at: Some(wit.lifecycle.created_at),
                updated_at: Some(wit.lifecycle.updated_at),
            }),
        }),
    }
}

/// Merge an incoming document onto `current`.
///
/// The path is never taken from the document: ancestry is fixed when the
/// type is created.
///
/// # Errors
///
/// Returns [`EngineError::BadParameter`] for a missing `data`, an empty
/// name, or a merged record that fails [`WorkItemType::check_valid`].
pub fn work_item_type_to_model(
    document: &WorkItemTypeDocument,
    current: &WorkItemType,
) -> Result<WorkItemType> {
    let data = document
        .data
        .as_ref()
        .ok_or_else(|| EngineError::bad_parameter("data", "null").expected("not null"))?;
    let mut base = current.clone();
    if let Some(id) = data.id {
        base.id = adopt_id(current.id, id)?;
        if base.id != current.id {
            base.path = current.path.with_own_id(&base.id);
        }
    }
    let Some(attrs) = &data.attributes else {
        return base.apply_patch(&WorkItemTypePatch::default());
    };
    let patch = WorkItemTypePatch {
        name: non_empty("data.attributes.name", attrs.name.as_ref())?,
        description: attrs.description.clone(),
        icon: attrs.icon.clone(),
        version: attrs.version,
        fields: attrs.fields.clone(),
    };
    base.apply_patch(&patch)
}

// ---------------------------------------------------------------------------
// Work items
// ---------------------------------------------------------------------------

/// Render a stored work item through its type's field schema.
///
/// # Errors
///
/// Returns [`EngineError::BadParameter`] on `type` when the item is not of
/// type `wit`, and [`EngineError::Conversion`] for the first field that
/// fails to convert.
pub fn work_item_from_model(wit: &WorkItemType, item: &WorkItem) -> Result<WorkItemResource> {
    if item.type_id != wit.id {
        return Err(EngineError::bad_parameter("type", item.type_id).expected(wit.id.to_string()));
    }
    Ok(WorkItemResource {
        id: item.id.to_string(),
        type_id: item.type_id,
        version: item.version,
        fields: wit.convert_fields_from_model(&item.fields)?,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A document may name the record it updates, but never re-identify it.
fn adopt_id(current: Uuid, incoming: Uuid) -> Result<Uuid> {
    if current.is_nil() || current == incoming {
        Ok(incoming)
    } else {
        Err(EngineError::bad_parameter("data.id", incoming).expected(current.to_string()))
    }
}

fn non_empty(field: &str, value: Option<&String>) -> Result<Option<String>> {
    match value {
        Some(v) if v.is_empty() => Err(EngineError::bad_parameter(field, v)),
        other => Ok(other.cloned()),
    }
}

fn relation_id(name: &str, relation: Option<&Relation>, kind: &str) -> Result<Option<Uuid>> {
    let Some(data) = relation.and_then(|r| r.data.as_ref()) else {
        return Ok(None);
    };
    if data.kind != kind {
        return Err(
            EngineError::bad_parameter(format!("data.relationships.{name}.data.type"), &data.kind)
                .expected(kind),
        );
    }
    Ok(Some(data.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDefinition, Kind};
    use crate::ident::{LINK_CATEGORY_SYSTEM, SYSTEM_CREATED_AT, SYSTEM_SPACE, SYSTEM_TITLE, SystemType};
    use crate::link::Topology;
    use serde_json::json;

    fn stored_link_type() -> WorkItemLinkType {
        WorkItemLinkType {
            id: Uuid::new_v4(),
            name: "Bug blocker".into(),
            description: Some("one bug blocks another".into()),
            version: 4,
            topology: Some(Topology::Network),
            source_type_id: SystemType::Bug.id(),
            target_type_id: SystemType::Bug.id(),
            forward_name: "blocks".into(),
            reverse_name: "blocked by".into(),
            link_category_id: LINK_CATEGORY_SYSTEM,
            space_id: SYSTEM_SPACE,
            ..WorkItemLinkType::default()
        }
    }

    fn parse(value: serde_json::Value) -> LinkTypeDocument {
        serde_json::from_value(value).expect("document")
    }

    #[test]
    fn topology_only_update_keeps_everything_else() {
        let stored = stored_link_type();
        let doc = parse(json!({"data": {"type": "workitemlinktypes", "attributes": {"topology": "tree"}}}));
        let updated = link_type_to_model(&doc, &stored).expect("valid update");
        assert_eq!(updated.topology, Some(Topology::Tree));
        assert_eq!(
            WorkItemLinkType {
                topology: stored.topology,
                ..updated
            },
            stored
        );
        assert_eq!(stored.topology, Some(Topology::Network));
    }

    #[test]
    fn missing_data_is_rejected() {
        let err = link_type_to_model(&LinkTypeDocument::default(), &stored_link_type())
            .expect_err("no data");
        assert_eq!(err.field(), Some("data"));
    }

    #[test]
    fn empty_names_name_the_document_member() {
        for member in ["name", "forward_name", "reverse_name"] {
            let doc = parse(json!({"data": {"attributes": {member: ""}}}));
            let err = link_type_to_model(&doc, &stored_link_type()).expect_err("empty");
            assert_eq!(err.field(), Some(format!("data.attributes.{member}").as_str()));
        }
    }

    #[test]
    fn unknown_topology_is_rejected() {
        let doc = parse(json!({"data": {"attributes": {"topology": "star"}}}));
        let err = link_type_to_model(&doc, &stored_link_type()).expect_err("bad topology");
        assert_eq!(err.field(), Some("topology"));
    }

    #[test]
    fn relationships_update_ids_and_check_kind() {
        let stored = stored_link_type();
        let planner = SystemType::PlannerItem.id();
        let doc = parse(json!({"data": {"relationships": {
            "target_type": {"data": {"type": "workitemtypes", "id": planner}}
        }}}));
        let updated = link_type_to_model(&doc, &stored).expect("valid");
        assert_eq!(updated.target_type_id, planner);
        assert_eq!(updated.source_type_id, stored.source_type_id);

        let doc = parse(json!({"data": {"relationships": {
            "space": {"data": {"type": "workitemtypes", "id": planner}}
        }}}));
        let err = link_type_to_model(&doc, &stored).expect_err("wrong kind");
        assert_eq!(err.field(), Some("data.relationships.space.data.type"));
    }

    #[test]
    fn creation_from_document_is_fully_validated() {
        let doc = parse(json!({"data": {"attributes": {"name": "Duplicates", "topology": "network"}}}));
        let err = link_type_to_model(&doc, &WorkItemLinkType::default()).expect_err("incomplete");
        assert_eq!(err.field(), Some("source_type_id"));
    }

    #[test]
    fn document_cannot_change_identity() {
        let doc = parse(json!({"data": {"id": Uuid::new_v4()}}));
        let err = link_type_to_model(&doc, &stored_link_type()).expect_err("different id");
        assert_eq!(err.field(), Some("data.id"));
    }

    #[test]
    fn from_model_then_to_model_is_identity() {
        let stored = stored_link_type();
        let doc = link_type_from_model(&stored);
        assert_eq!(link_type_to_model(&doc, &stored).expect("valid"), stored);
    }

    fn planner() -> WorkItemType {
        let mut wit = WorkItemType::new_root(SystemType::PlannerItem.id(), "planneritem", "fa fa-bookmark");
        wit.fields
            .insert(SYSTEM_TITLE, FieldDefinition::new("Title", Kind::String, true));
        wit.fields.insert(
            SYSTEM_CREATED_AT,
            FieldDefinition::new("Created at", Kind::Instant, false),
        );
        wit
    }

    #[test]
    fn work_item_type_update_keeps_path() {
        let wit = planner();
        let doc: WorkItemTypeDocument = serde_json::from_value(json!({
            "data": {"attributes": {"icon": "fa fa-star", "path": "bogus"}}
        }))
        .expect("document");
        let updated = work_item_type_to_model(&doc, &wit).expect("valid");
        assert_eq!(updated.icon, "fa fa-star");
        assert_eq!(updated.path, wit.path);
    }

    #[test]
    fn work_item_type_draft_adopts_document_id() {
        let parent = planner();
        let draft = WorkItemType::new_child(Uuid::nil(), "regression", "", &parent);
        let id = Uuid::new_v4();
        let doc: WorkItemTypeDocument = serde_json::from_value(json!({
            "data": {"id": id, "attributes": {"icon": "fa fa-history"}}
        }))
        .expect("document");
        let created = work_item_type_to_model(&doc, &draft).expect("valid");
        assert_eq!(created.id, id);
        assert_eq!(created.path, parent.path.child(&id));
        assert!(created.is_type_or_subtype_of(&parent.id));

        let other: WorkItemTypeDocument =
            serde_json::from_value(json!({"data": {"id": Uuid::new_v4()}})).expect("document");
        let err = work_item_type_to_model(&other, &created).expect_err("different id");
        assert_eq!(err.field(), Some("data.id"));
    }

    #[test]
    fn work_item_renders_external_fields() {
        let wit = planner();
        let item = WorkItem::new(42, wit.id)
            .with_field(SYSTEM_TITLE, json!("Crash on save"))
            .with_field(SYSTEM_CREATED_AT, json!(0));
        let resource = work_item_from_model(&wit, &item).expect("convert");
        assert_eq!(resource.id, "42");
        assert_eq!(resource.fields.get(SYSTEM_TITLE), Some(&json!("Crash on save")));
        assert!(!resource.fields.contains_key(SYSTEM_CREATED_AT));
    }

    #[test]
    fn work_item_of_another_type_is_rejected() {
        let item = WorkItem::new(1, SystemType::Bug.id());
        let err = work_item_from_model(&planner(), &item).expect_err("wrong type");
        assert_eq!(err.field(), Some("type"));
    }
}
