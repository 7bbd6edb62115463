//! Inverse-field translation (spec.md §4.3 step 5): writes to the "many"
//! side of a relation (`allowMultiple` + `inverseOf`) are rewritten as
//! updates on the "one" side, since the one-to-many relation is stored
//! only on the child.

use ledgergraph_types::Value;

use crate::algebra::{ChangeOp, ListMutation};
use crate::model::{EntityRef, Namespace};
use crate::store::EntityStore;

use super::ProcItemError;

/// For each `insert`/`remove` mutation against a field declared
/// `allowMultiple` + `inverseOf: inverse_field`, produce the equivalent
/// child-side `(child_uid, ChangeOp)` update.
pub fn translate_mutations(
    store: &dyn EntityStore,
    ns: Namespace,
    parent_uid: &str,
    inverse_field: &str,
    mutations: &[ListMutation],
) -> Result<Vec<(String, ChangeOp)>, ProcItemError> {
    let mut writes = Vec::new();
    for mutation in mutations {
        match mutation {
            ListMutation::Insert { value, .. } => {
                let child_uid = value.as_str().ok_or_else(|| {
                    ProcItemError::whole("inverse-field insert requires a resolved uid string")
                })?;
                let prior = current_inverse_value(store, ns, child_uid, inverse_field)?;
                writes.push((
                    child_uid.to_string(),
                    ChangeOp::set(Value::String(parent_uid.to_string()), prior),
                ));
            }
            ListMutation::Remove { value, .. } => {
                let child_uid = value.as_str().ok_or_else(|| {
                    ProcItemError::whole("inverse-field remove requires a resolved uid string")
                })?;
                writes.push((
                    child_uid.to_string(),
                    ChangeOp::set(Value::Null, Value::String(parent_uid.to_string())),
                ));
            }
            ListMutation::Patch { .. } => {
                return Err(ProcItemError::whole(
                    "patch mutations are not supported on inverse-field relations",
                ));
            }
        }
    }
    Ok(writes)
}

fn current_inverse_value(
    store: &dyn EntityStore,
    ns: Namespace,
    child_uid: &str,
    inverse_field: &str,
) -> Result<Value, ProcItemError> {
    let child_ref = crate::model::identifiers::Uid::parse(child_uid)
        .map(EntityRef::Uid)
        .ok_or_else(|| ProcItemError::whole(format!("'{child_uid}' is not a valid uid")))?;
    match store.fetch_entity(ns, &child_ref) {
        Ok(entity) => Ok(entity.fields.get(inverse_field).cloned().unwrap_or(Value::Null)),
        Err(_) => Ok(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryEntityStore;
    use serde_json::json;

    #[test]
    fn insert_translates_to_child_side_set_with_prior_value() {
        let store = MemoryEntityStore::new();
        let mut fields = crate::model::Fieldset::new();
        fields.insert("type".into(), json!("Task"));
        let child = store.create_entity(Namespace::Record, fields).unwrap();

        let mutations = vec![ListMutation::Insert {
            value: json!(child.uid.as_str()),
            index: None,
        }];
        let writes = translate_mutations(&store, Namespace::Record, "pr1", "project", &mutations).unwrap();
        assert_eq!(writes.len(), 1);
        match &writes[0].1 {
            ChangeOp::Set { value, previous } => {
                assert_eq!(value, &json!("pr1"));
                assert!(previous.is_null());
            }
            _ => panic!("expected Set"),
        }
    }

    #[test]
    fn remove_translates_to_child_side_null() {
        let store = MemoryEntityStore::new();
        let mutations = vec![ListMutation::Remove {
            value: json!("abcdEFGH12"),
            index: None,
        }];
        let writes = translate_mutations(&store, Namespace::Record, "pr1", "project", &mutations).unwrap();
        match &writes[0].1 {
            ChangeOp::Set { value, previous } => {
                assert!(value.is_null());
                assert_eq!(previous, &json!("pr1"));
            }
            _ => panic!("expected Set"),
        }
    }
}
