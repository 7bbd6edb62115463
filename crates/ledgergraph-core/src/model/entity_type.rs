//! Type definitions (`TypeDef`) — the `config`-resident entities that name
//! which fields a record type carries, analogous to
//! `ormdb-core::catalog::entity::EntityDef`, but with per-field attribute
//! overrides instead of a flat field list (spec.md §3).

use ledgergraph_types::Value;
use serde::{Deserialize, Serialize};

use super::field::Condition;

/// Per-type override of a field's schema-level attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// A fixed value constraint: every entity of this type has exactly
    /// this value for the field, and it is not accepted from user input
    /// (spec.md §4.3 step 2: "enforce any `FieldAttrs.value` constraint").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
}

/// One entry in a `TypeDef`'s field list: either a bare field key or a key
/// with attribute overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeFieldEntry {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<FieldAttrs>,
}

impl TypeFieldEntry {
    pub fn bare(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attrs: None,
        }
    }

    pub fn with_attrs(key: impl Into<String>, attrs: FieldAttrs) -> Self {
        Self {
            key: key.into(),
            attrs: Some(attrs),
        }
    }
}

/// Definition of one record (or reserved config) type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub fields: Vec<TypeFieldEntry>,
}

impl TypeDef {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            extends: None,
            fields: Vec::new(),
        }
    }

    pub fn field_entry(&self, key: &str) -> Option<&TypeFieldEntry> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn with_fields(mut self, fields: Vec<TypeFieldEntry>) -> Self {
        self.fields = fields;
        self
    }
}
