//! The stored entity row (spec.md §3).

use ledgergraph_types::Value;
use serde::{Deserialize, Serialize};

use super::identifiers::{EntityId, Uid};

/// Flat map from field key to current value for one entity
/// ("Fieldset" in the glossary).
pub type Fieldset = serde_json::Map<String, Value>;

/// A stored entity row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub uid: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "type")]
    pub type_key: String,
    pub fields: Fieldset,
    pub tx_ids: Vec<u64>,
}

impl Entity {
    pub fn new(id: EntityId, uid: Uid, type_key: impl Into<String>) -> Self {
        Self {
            id,
            uid,
            key: None,
            type_key: type_key.into(),
            fields: Fieldset::new(),
            tx_ids: Vec::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entity_has_empty_fields() {
        let e = Entity::new(EntityId(1), Uid::generate(), "Task");
        assert!(e.fields.is_empty());
        assert!(e.tx_ids.is_empty());
        assert_eq!(e.type_key, "Task");
    }
}
