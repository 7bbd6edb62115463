//! The dynamic record schema: `{fields, types}}`, materialised from
//! `config` rows (spec.md §3, §4.5).
//!
//! Grounded on `ormdb-core::catalog::schema::SchemaBundle`'s map-of-maps
//! shape, but `extends` resolution replaces the teacher's flat entity list
//! since record types here form a single-inheritance chain instead of
//! independent tables (spec.md §9: "resolve by iteration with a visited
//! set to guard cycles — do not recurse blindly").

use std::collections::HashMap;

use crate::error::Error;

use super::entity_type::{FieldAttrs, TypeDef};
use super::field::{is_identity_field, DataType, FieldDef};

/// A schema snapshot: every known field definition and every known type
/// definition, keyed by their field/type key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSchema {
    pub fields: HashMap<String, FieldDef>,
    pub types: HashMap<String, TypeDef>,
}

impl NodeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// A schema carrying only the always-present identity fields, used as
    /// the base the config changeset is folded into at the start of each
    /// `update` (spec.md §4.4 step 3).
    pub fn with_core_identity_fields(mut self) -> Self {
        for key in ["id", "uid", "key", "type", "txIds"] {
            self.fields.entry(key.to_string()).or_insert_with(|| {
                let mut def = FieldDef::new(key, DataType::Uid);
                def.immutable = true;
                def
            });
        }
        self
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.key.clone(), field);
        self
    }

    pub fn with_type(mut self, type_def: TypeDef) -> Self {
        self.types.insert(type_def.key.clone(), type_def);
        self
    }

    pub fn get_field(&self, key: &str) -> Option<&FieldDef> {
        self.fields.get(key)
    }

    pub fn get_type(&self, key: &str) -> Option<&TypeDef> {
        self.types.get(key)
    }

    /// Resolve `type_key`'s full `extends` chain, closest ancestor first,
    /// starting with the type itself. A type appearing twice indicates a
    /// cycle and is rejected rather than looped over forever.
    pub fn type_chain<'a>(&'a self, type_key: &str) -> Result<Vec<&'a TypeDef>, Error> {
        let mut chain = Vec::new();
        let mut visited = std::collections::HashSet::new();
        let mut current = Some(type_key.to_string());

        while let Some(key) = current {
            if !visited.insert(key.clone()) {
                return Err(Error::Schema(format!(
                    "cyclic 'extends' chain detected at type '{key}'"
                )));
            }
            let type_def = self
                .types
                .get(&key)
                .ok_or_else(|| Error::Schema(format!("unknown type '{key}'")))?;
            chain.push(type_def);
            current = type_def.extends.clone();
        }

        Ok(chain)
    }

    /// Merge `(field key -> attrs)` across a type's `extends` chain. The
    /// type itself wins over any ancestor when both declare the same
    /// field key.
    pub fn merged_field_attrs(
        &self,
        type_key: &str,
    ) -> Result<HashMap<String, FieldAttrs>, Error> {
        let chain = self.type_chain(type_key)?;
        let mut merged: HashMap<String, FieldAttrs> = HashMap::new();
        for type_def in chain {
            for entry in &type_def.fields {
                merged
                    .entry(entry.key.clone())
                    .or_insert_with(|| entry.attrs.clone().unwrap_or_default());
            }
        }
        Ok(merged)
    }

    /// All field keys allowed on `type_key` (own + inherited).
    pub fn allowed_fields(&self, type_key: &str) -> Result<Vec<String>, Error> {
        Ok(self.merged_field_attrs(type_key)?.into_keys().collect())
    }

    /// Mandatory fields for `type_key`: required on the type or any
    /// ancestor, minus fields pinned to a fixed `value` (spec.md §4.3
    /// step 3).
    pub fn mandatory_fields(&self, type_key: &str) -> Result<Vec<String>, Error> {
        let merged = self.merged_field_attrs(type_key)?;
        Ok(merged
            .into_iter()
            .filter(|(_, attrs)| attrs.required == Some(true) && attrs.value.is_none())
            .map(|(key, _)| key)
            .collect())
    }

    pub fn is_known_field(&self, key: &str) -> bool {
        is_identity_field(key) || self.fields.contains_key(key)
    }
}
