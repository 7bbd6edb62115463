//! An in-process reference [`EntityStore`], standing in for the SQL row
//! store that spec.md §1 names as an external collaborator. Grounded on
//! `ormdb-core::storage::engine`'s role, but backed by three plain
//! `HashMap`s per spec.md §6's "persisted layout" note instead of sled,
//! since the real storage engine is explicitly out of this core's scope.

use std::collections::HashMap;

use ledgergraph_types::{canonical_eq, Value};
use parking_lot::RwLock;
use tracing::debug;

use crate::model::{Entity, EntityId, EntityRef, Fieldset, Namespace};
use crate::version::Version;

use super::traits::{EntityStore, StoreError, StoredTransaction};

/// `txIds` travels through changesets as a field like any other, but is
/// stored on [`Entity::tx_ids`] rather than in the fields map proper.
fn take_tx_ids(fields: &mut Fieldset) -> Vec<u64> {
    fields
        .remove("txIds")
        .and_then(|v| v.as_array().map(|items| items.iter().filter_map(Value::as_u64).collect()))
        .unwrap_or_default()
}

#[derive(Default)]
struct NamespaceTable {
    by_id: HashMap<u64, Entity>,
    uid_index: HashMap<String, u64>,
    key_index: HashMap<String, u64>,
    last_id: u64,
}

impl NamespaceTable {
    fn resolve(&self, reference: &EntityRef) -> Option<u64> {
        match reference {
            EntityRef::Id(id) => self.by_id.contains_key(&id.0).then_some(id.0),
            EntityRef::Uid(uid) => self.uid_index.get(uid.as_str()).copied(),
            EntityRef::Key(key) => self.key_index.get(key).copied(),
        }
    }
}

#[derive(Default)]
struct Inner {
    namespaces: HashMap<Namespace, NamespaceTable>,
    transactions: HashMap<u64, StoredTransaction>,
    version: Version,
}

impl Inner {
    fn table(&self, ns: Namespace) -> Option<&NamespaceTable> {
        self.namespaces.get(&ns)
    }

    fn table_mut(&mut self, ns: Namespace) -> &mut NamespaceTable {
        self.namespaces.entry(ns).or_default()
    }
}

/// Thread-safe in-memory [`EntityStore`]. Suitable for tests and for
/// embedding clients that don't need durability.
pub struct MemoryEntityStore {
    inner: RwLock<Inner>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for MemoryEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for MemoryEntityStore {
    fn fetch_entity_fieldset(
        &self,
        ns: Namespace,
        reference: &EntityRef,
        keys: &[String],
    ) -> Result<Fieldset, StoreError> {
        let entity = self.fetch_entity(ns, reference)?;
        if keys.is_empty() {
            return Ok(entity.fields);
        }
        let mut subset = Fieldset::new();
        for key in keys {
            if let Some(v) = entity.fields.get(key) {
                subset.insert(key.clone(), v.clone());
            }
        }
        Ok(subset)
    }

    fn fetch_entity(&self, ns: Namespace, reference: &EntityRef) -> Result<Entity, StoreError> {
        let guard = self.inner.read();
        let table = guard.table(ns).ok_or_else(|| StoreError::NotFound {
            namespace: ns,
            reference: reference.to_string(),
        })?;
        let id = table.resolve(reference).ok_or_else(|| StoreError::NotFound {
            namespace: ns,
            reference: reference.to_string(),
        })?;
        table
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                namespace: ns,
                reference: reference.to_string(),
            })
    }

    fn create_entity(&self, ns: Namespace, fieldset: Fieldset) -> Result<Entity, StoreError> {
        let mut guard = self.inner.write();
        let table = guard.table_mut(ns);

        // The changeset processor allocates `id` up front so a batch of
        // creates gets contiguous ids (spec.md §4.3 step 7); honor it when
        // present and only self-assign for callers (mostly tests) that
        // create entities directly without going through a changeset.
        let id = fieldset
            .get("id")
            .and_then(|v| v.as_u64())
            .unwrap_or(table.last_id + 1);
        table.last_id = table.last_id.max(id);

        let uid = fieldset
            .get("uid")
            .and_then(|v| v.as_str())
            .and_then(crate::model::identifiers::Uid::parse)
            .unwrap_or_else(crate::model::identifiers::Uid::generate);
        let key = fieldset
            .get("key")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let type_key = fieldset
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let mut entity = Entity::new(EntityId(id), uid.clone(), type_key);
        entity.key = key.clone();
        entity.fields = fieldset;
        entity.tx_ids = take_tx_ids(&mut entity.fields);

        table.uid_index.insert(uid.as_str().to_string(), id);
        if let Some(k) = &key {
            table.key_index.insert(k.clone(), id);
        }
        table.by_id.insert(id, entity.clone());

        debug!(namespace = %ns, id, uid = uid.as_str(), "created entity");
        Ok(entity)
    }

    fn update_entity(
        &self,
        ns: Namespace,
        reference: &EntityRef,
        patch: &Fieldset,
    ) -> Result<Entity, StoreError> {
        let mut guard = self.inner.write();
        let table = guard.table_mut(ns);
        let id = table.resolve(reference).ok_or_else(|| StoreError::NotFound {
            namespace: ns,
            reference: reference.to_string(),
        })?;
        let entity = table.by_id.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            namespace: ns,
            reference: reference.to_string(),
        })?;

        for (k, v) in patch {
            if k == "txIds" {
                continue;
            }
            if v.is_null() {
                entity.fields.remove(k);
            } else {
                entity.fields.insert(k.clone(), v.clone());
            }
        }
        if let Some(tx_ids) = patch.get("txIds").and_then(Value::as_array) {
            entity.tx_ids = tx_ids.iter().filter_map(Value::as_u64).collect();
        }
        if let Some(key_val) = patch.get("key") {
            let new_key = key_val.as_str().map(str::to_string);
            if entity.key != new_key {
                if let Some(old) = &entity.key {
                    table.key_index.remove(old);
                }
                if let Some(k) = &new_key {
                    table.key_index.insert(k.clone(), id);
                }
                entity.key = new_key;
            }
        }
        Ok(entity.clone())
    }

    fn delete_entity(&self, ns: Namespace, reference: &EntityRef) -> Result<(), StoreError> {
        let mut guard = self.inner.write();
        let table = guard.table_mut(ns);
        let id = table.resolve(reference).ok_or_else(|| StoreError::NotFound {
            namespace: ns,
            reference: reference.to_string(),
        })?;
        if let Some(entity) = table.by_id.remove(&id) {
            table.uid_index.remove(entity.uid.as_str());
            if let Some(k) = &entity.key {
                table.key_index.remove(k);
            }
        }
        Ok(())
    }

    fn entity_exists(&self, ns: Namespace, reference: &EntityRef) -> bool {
        let guard = self.inner.read();
        guard
            .table(ns)
            .and_then(|t| t.resolve(reference))
            .is_some()
    }

    fn resolve_entity_refs(&self, ns: Namespace, refs: &[EntityRef]) -> Vec<Option<String>> {
        let guard = self.inner.read();
        let Some(table) = guard.table(ns) else {
            return vec![None; refs.len()];
        };
        refs.iter()
            .map(|r| {
                table
                    .resolve(r)
                    .and_then(|id| table.by_id.get(&id))
                    .map(|e| e.uid.as_str().to_string())
            })
            .collect()
    }

    fn get_last_entity_id(&self, ns: Namespace) -> EntityId {
        let guard = self.inner.read();
        EntityId(guard.table(ns).map(|t| t.last_id).unwrap_or(0))
    }

    fn list_by_type(&self, ns: Namespace, type_key: &str) -> Vec<Entity> {
        let guard = self.inner.read();
        guard
            .table(ns)
            .map(|t| {
                t.by_id
                    .values()
                    .filter(|e| e.type_key == type_key)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn find_conflicting_unique(
        &self,
        ns: Namespace,
        field: &str,
        value: &Value,
        exclude: Option<&EntityRef>,
    ) -> Option<Entity> {
        let guard = self.inner.read();
        let table = guard.table(ns)?;
        let exclude_id = exclude.and_then(|r| table.resolve(r));
        table
            .by_id
            .values()
            .find(|e| {
                Some(e.id.0) != exclude_id
                    && e.fields.get(field).map(|v| canonical_eq(v, value)).unwrap_or(false)
            })
            .cloned()
    }

    fn get_version(&self) -> Version {
        self.inner.read().version.clone()
    }

    fn fetch_transaction(&self, reference: &EntityRef) -> Result<StoredTransaction, StoreError> {
        let id = match reference {
            EntityRef::Id(id) => id.0,
            other => return Err(StoreError::TransactionNotFound(other.to_string())),
        };
        self.inner
            .read()
            .transactions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::TransactionNotFound(id.to_string()))
    }

    fn save_transaction(&self, transaction: StoredTransaction) -> Result<(), StoreError> {
        let mut guard = self.inner.write();
        guard.version = Version {
            id: transaction.id,
            hash: transaction.hash.clone(),
            updated_at: transaction.created_at.clone(),
        };
        guard.transactions.insert(transaction.id, transaction);
        Ok(())
    }

    fn delete_transactions_above(&self, keep_below: u64) {
        let mut guard = self.inner.write();
        guard.transactions.retain(|id, _| *id <= keep_below);
        let new_tip = guard
            .transactions
            .values()
            .max_by_key(|t| t.id)
            .cloned();
        guard.version = match new_tip {
            Some(t) => Version {
                id: t.id,
                hash: t.hash,
                updated_at: t.created_at,
            },
            None => Version::genesis(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fieldset(pairs: &[(&str, Value)]) -> Fieldset {
        let mut m = Fieldset::new();
        for (k, v) in pairs {
            m.insert((*k).to_string(), v.clone());
        }
        m
    }

    #[test]
    fn create_then_fetch_by_uid() {
        let store = MemoryEntityStore::new();
        let entity = store
            .create_entity(Namespace::Record, fieldset(&[("type", json!("Task")), ("title", json!("T1"))]))
            .unwrap();

        let fetched = store
            .fetch_entity(Namespace::Record, &EntityRef::Uid(entity.uid.clone()))
            .unwrap();
        assert_eq!(fetched.get("title"), Some(&json!("T1")));
    }

    #[test]
    fn update_removes_null_fields() {
        let store = MemoryEntityStore::new();
        let entity = store
            .create_entity(Namespace::Record, fieldset(&[("type", json!("Task")), ("title", json!("T1"))]))
            .unwrap();

        store
            .update_entity(
                Namespace::Record,
                &EntityRef::Uid(entity.uid.clone()),
                &fieldset(&[("title", Value::Null)]),
            )
            .unwrap();

        let fetched = store
            .fetch_entity(Namespace::Record, &EntityRef::Uid(entity.uid))
            .unwrap();
        assert!(fetched.get("title").is_none());
    }

    #[test]
    fn delete_then_not_found() {
        let store = MemoryEntityStore::new();
        let entity = store
            .create_entity(Namespace::Record, fieldset(&[("type", json!("Task"))]))
            .unwrap();
        store
            .delete_entity(Namespace::Record, &EntityRef::Uid(entity.uid.clone()))
            .unwrap();
        assert!(!store.entity_exists(Namespace::Record, &EntityRef::Uid(entity.uid)));
    }

    #[test]
    fn list_by_type_returns_only_matching_entities() {
        let store = MemoryEntityStore::new();
        store
            .create_entity(Namespace::Config, fieldset(&[("type", json!("Field")), ("key", json!("title"))]))
            .unwrap();
        store
            .create_entity(Namespace::Config, fieldset(&[("type", json!("Type")), ("key", json!("Task"))]))
            .unwrap();

        let fields = store.list_by_type(Namespace::Config, "Field");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].key.as_deref(), Some("title"));
    }

    #[test]
    fn uniqueness_probe_excludes_self() {
        let store = MemoryEntityStore::new();
        let a = store
            .create_entity(Namespace::Record, fieldset(&[("type", json!("User")), ("email", json!("a@x"))]))
            .unwrap();

        assert!(store
            .find_conflicting_unique(Namespace::Record, "email", &json!("a@x"), Some(&EntityRef::Uid(a.uid.clone())))
            .is_none());

        let b = store
            .create_entity(Namespace::Record, fieldset(&[("type", json!("User")), ("email", json!("a@x"))]))
            .unwrap();
        assert!(store
            .find_conflicting_unique(Namespace::Record, "email", &json!("a@x"), Some(&EntityRef::Uid(b.uid)))
            .is_some());
    }
}
