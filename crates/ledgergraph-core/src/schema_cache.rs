//! The resolved-schema cache (spec.md §5, expanded in SPEC_FULL.md §4.5):
//! holds the `NodeSchema` folded from the `config` namespace's current
//! contents, so every `update`/`apply` doesn't refold it from scratch.
//! Invalidated synchronously whenever a committed transaction touches a
//! non-empty `configs` changeset, or a rollback reverts one.

use parking_lot::RwLock;

use ledgergraph_types::Value;

use crate::error::Error;
use crate::model::{Entity, FieldDef, Namespace, NodeSchema, TypeDef};
use crate::store::EntityStore;

/// Rebuild the record schema from the current contents of the `config`
/// namespace's `Field`/`Type` rows (spec.md §4.5). Unlike
/// [`crate::changeset_processor::apply_config_changeset_to_schema`], which
/// only folds the creating entries of one transaction's changeset, this
/// reads the store's current state directly, so prior updates/deletes to
/// a `Field`/`Type` row are already reflected.
pub fn build_node_schema(store: &dyn EntityStore) -> Result<NodeSchema, Error> {
    let mut schema = NodeSchema::new().with_core_identity_fields();

    for entity in store.list_by_type(Namespace::Config, "Field") {
        let field_def: FieldDef = serde_json::from_value(Value::Object(entity_row_to_json(&entity)))
            .map_err(|e| Error::Schema(format!("invalid Field config row '{}': {e}", entity.uid)))?;
        field_def.is_schema_valid().map_err(Error::Schema)?;
        schema = schema.with_field(field_def);
    }

    for entity in store.list_by_type(Namespace::Config, "Type") {
        let type_def: TypeDef = serde_json::from_value(Value::Object(entity_row_to_json(&entity)))
            .map_err(|e| Error::Schema(format!("invalid Type config row '{}': {e}", entity.uid)))?;
        schema = schema.with_type(type_def);
    }

    Ok(schema)
}

/// `FieldDef`/`TypeDef` both declare a `key` field that, for a config row,
/// is the entity's own identifier `key` rather than a value inside
/// `fields` — merge the two before deserializing.
fn entity_row_to_json(entity: &Entity) -> serde_json::Map<String, Value> {
    let mut map = entity.fields.clone();
    if let Some(key) = &entity.key {
        map.insert("key".to_string(), Value::String(key.clone()));
    }
    map
}

/// Caches the folded node schema. Cheap to construct; one instance lives
/// for the life of a `ledgergraph::Db`.
#[derive(Debug, Default)]
pub struct SchemaCache {
    resolved: RwLock<Option<NodeSchema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self {
            resolved: RwLock::new(None),
        }
    }

    /// Returns the cached schema if present, else computes it via `build`,
    /// caches, and returns it.
    pub fn get_or_build(&self, build: impl FnOnce() -> NodeSchema) -> NodeSchema {
        if let Some(schema) = self.resolved.read().clone() {
            return schema;
        }
        let mut guard = self.resolved.write();
        if let Some(schema) = guard.clone() {
            return schema;
        }
        let schema = build();
        *guard = Some(schema.clone());
        schema
    }

    /// [`Self::get_or_build`] specialised to [`build_node_schema`], the
    /// only builder this cache is actually used with outside of tests.
    pub fn get_or_rebuild(&self, store: &dyn EntityStore) -> Result<NodeSchema, Error> {
        if let Some(schema) = self.resolved.read().clone() {
            return Ok(schema);
        }
        let mut guard = self.resolved.write();
        if let Some(schema) = guard.clone() {
            return Ok(schema);
        }
        let schema = build_node_schema(store)?;
        *guard = Some(schema.clone());
        Ok(schema)
    }

    /// Drops the cached schema. The next `get_or_build` call recomputes it.
    pub fn invalidate(&self) {
        *self.resolved.write() = None;
    }

    /// Whether a changeset should trigger [`Self::invalidate`]: any
    /// non-empty `configs` changeset, per spec.md §5.
    pub fn should_invalidate(configs_changeset_len: usize) -> bool {
        configs_changeset_len > 0
    }
}
