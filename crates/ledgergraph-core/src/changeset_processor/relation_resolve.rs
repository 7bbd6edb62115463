//! Relation key→uid resolution (spec.md §4.3 step 4): prefer an
//! intra-batch create with a matching `key`, then fall back to the store.

use std::collections::HashMap;

use ledgergraph_types::Value;

use crate::model::{EntityRef, Namespace};
use crate::store::EntityStore;

use super::ProcItemError;

/// Keys assigned to not-yet-committed creates earlier in the same batch,
/// `key -> uid`.
pub type BatchKeyIndex = HashMap<String, String>;

/// Resolve a single relation target (a bare string or the first element
/// of a `[ref, attrs]` tuple) to a `uid`. Already-valid uids pass through
/// unchanged.
pub fn resolve_relation_ref(
    store: &dyn EntityStore,
    ns: Namespace,
    batch: &BatchKeyIndex,
    raw_ref: &str,
) -> Result<String, ProcItemError> {
    if crate::model::identifiers::Uid::parse(raw_ref).is_some() {
        return Ok(raw_ref.to_string());
    }
    if let Some(uid) = batch.get(raw_ref) {
        return Ok(uid.clone());
    }
    let resolved = store
        .resolve_entity_refs(ns, &[EntityRef::Key(raw_ref.to_string())])
        .into_iter()
        .next()
        .flatten();
    resolved.ok_or_else(|| {
        ProcItemError::whole(format!("relation reference '{raw_ref}' could not be resolved"))
    })
}

/// Resolve every relation reference nested in a field value: a bare
/// string, a `[ref, attrs]` tuple, or an array of either (for
/// `allowMultiple` relation fields).
pub fn resolve_relation_value(
    store: &dyn EntityStore,
    ns: Namespace,
    batch: &BatchKeyIndex,
    value: &Value,
) -> Result<Value, ProcItemError> {
    match value {
        Value::String(s) => Ok(Value::String(resolve_relation_ref(store, ns, batch, s)?)),
        Value::Array(items) if is_ref_attrs_tuple(items) => {
            let uid = resolve_relation_ref(store, ns, batch, items[0].as_str().unwrap_or_default())?;
            Ok(Value::Array(vec![Value::String(uid), items[1].clone()]))
        }
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(resolve_relation_value(store, ns, batch, item)?);
            }
            Ok(Value::Array(resolved))
        }
        other => Ok(other.clone()),
    }
}

fn is_ref_attrs_tuple(items: &[Value]) -> bool {
    items.len() == 2 && items[0].is_string() && items[1].is_object()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryEntityStore;
    use serde_json::json;

    #[test]
    fn intra_batch_key_resolves_before_store_lookup() {
        let store = MemoryEntityStore::new();
        let mut batch = BatchKeyIndex::new();
        batch.insert("p1".into(), "abcdEFGH12".into());

        let resolved = resolve_relation_ref(&store, Namespace::Record, &batch, "p1").unwrap();
        assert_eq!(resolved, "abcdEFGH12");
    }

    #[test]
    fn unresolvable_key_is_an_error() {
        let store = MemoryEntityStore::new();
        let batch = BatchKeyIndex::new();
        assert!(resolve_relation_ref(&store, Namespace::Record, &batch, "missing").is_err());
    }

    #[test]
    fn tuple_form_resolves_first_element_only() {
        let store = MemoryEntityStore::new();
        let mut batch = BatchKeyIndex::new();
        batch.insert("p1".into(), "abcdEFGH12".into());

        let resolved =
            resolve_relation_value(&store, Namespace::Record, &batch, &json!(["p1", {"role": "owner"}]))
                .unwrap();
        assert_eq!(resolved, json!(["abcdEFGH12", {"role": "owner"}]));
    }
}
