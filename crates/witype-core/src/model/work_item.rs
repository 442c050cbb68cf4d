use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::field::FieldValues;

/// A single work item as handed over by the storage layer.
///
/// Work items are not stored by this crate; the struct only carries an item
/// through field conversion. `fields` holds stored-form values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    #[serde(rename = "type")]
    pub type_id: Uuid,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub fields: FieldValues,
}

impl WorkItem {
    #[must_use]
    pub const fn new(id: u64, type_id: Uuid) -> Self {
        Self {
            id,
            type_id,
            version: 0,
            fields: FieldValues::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::WorkItem;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn deserializes_with_type_key() {
        let id = Uuid::new_v4();
        let item: WorkItem = serde_json::from_value(json!({
            "id": 7,
            "type": id.to_string(),
            "fields": {"system.title": "x"},
        }))
        .expect("deserialize");
        assert_eq!(item, WorkItem::new(7, id).with_field("system.title", json!("x")));
    }
}
