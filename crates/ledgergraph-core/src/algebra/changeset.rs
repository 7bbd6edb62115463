//! `FieldChangeset`/`EntitiesChangeset` and the apply/inverse algebra
//! (spec.md §4.1).
//!
//! `apply ∘ inverse ∘ apply = apply`, and for a given start state
//! `inverse(c)` undoes `c` exactly — exercised in the `tests` module below
//! and again, end-to-end through the store, by the transaction processor's
//! own tests.

use std::collections::BTreeMap;

use ledgergraph_types::{canonical_eq, Value};

use crate::error::Error;
use crate::model::Fieldset;

use super::change_op::{set_effective_value, ChangeOp, ListMutation};

/// Per-field changes for one entity. A `BTreeMap` keeps field keys in
/// sorted order, which is what makes the containing transaction's
/// canonical hash reproducible without a separate sort step.
pub type FieldChangeset = BTreeMap<String, ChangeOp>;

/// Per-entity changesets for one namespace, keyed by the entity's
/// resolved `uid`.
pub type EntitiesChangeset = BTreeMap<String, FieldChangeset>;

/// Apply a [`FieldChangeset`] to a fieldset in place.
pub fn apply_changeset(fieldset: &mut Fieldset, changeset: &FieldChangeset) -> Result<(), Error> {
    for (key, op) in changeset {
        match op {
            ChangeOp::Set { value, .. } => match set_effective_value(value) {
                Some(v) => {
                    fieldset.insert(key.clone(), v.clone());
                }
                None => {
                    fieldset.remove(key);
                }
            },
            ChangeOp::Seq { mutations } => {
                let mut list = match fieldset.remove(key) {
                    Some(Value::Array(items)) => items,
                    Some(_) => {
                        return Err(Error::ListMutation(format!(
                            "field '{key}' is not a list"
                        )))
                    }
                    None => Vec::new(),
                };
                for mutation in mutations {
                    apply_list_mutation(&mut list, mutation, key)?;
                }
                fieldset.insert(key.clone(), Value::Array(list));
            }
        }
    }
    Ok(())
}

fn apply_list_mutation(
    list: &mut Vec<Value>,
    mutation: &ListMutation,
    field: &str,
) -> Result<(), Error> {
    match mutation {
        ListMutation::Insert { value, index } => {
            let at = index.unwrap_or(list.len()).min(list.len());
            list.insert(at, value.clone());
        }
        ListMutation::Remove { value, index } => {
            let found = list.iter().position(|v| canonical_eq(v, value));
            match (found, index) {
                (Some(pos), Some(expected)) if pos != *expected => {
                    return Err(Error::ListMutation(format!(
                        "field '{field}': remove index {expected} does not match value's actual position {pos}"
                    )));
                }
                (Some(pos), _) => {
                    list.remove(pos);
                }
                (None, _) => {
                    return Err(Error::ListMutation(format!(
                        "field '{field}': value to remove was not found"
                    )));
                }
            }
        }
        ListMutation::Patch { key, attrs, .. } => {
            let item = list
                .iter_mut()
                .find(|v| v.get("key").map(|k| canonical_eq(k, key)).unwrap_or(false));
            match item {
                Some(Value::Object(map)) => {
                    for (k, v) in attrs {
                        map.insert(k.clone(), v.clone());
                    }
                }
                Some(_) | None => {
                    return Err(Error::ListMutation(format!(
                        "field '{field}': no object item with key matching patch target"
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Build the inverse of a [`FieldChangeset`] (spec.md §4.1).
pub fn inverse_changeset(changeset: &FieldChangeset) -> Result<FieldChangeset, Error> {
    let mut inverse = FieldChangeset::new();
    for (key, op) in changeset {
        let inverted = match op {
            ChangeOp::Set { value, previous } => ChangeOp::Set {
                value: previous.clone(),
                previous: value.clone(),
            },
            ChangeOp::Seq { mutations } => {
                let mut inverted_muts = Vec::with_capacity(mutations.len());
                for mutation in mutations.iter().rev() {
                    inverted_muts.push(invert_list_mutation(mutation, key)?);
                }
                ChangeOp::Seq {
                    mutations: inverted_muts,
                }
            }
        };
        inverse.insert(key.clone(), inverted);
    }
    Ok(inverse)
}

fn invert_list_mutation(mutation: &ListMutation, field: &str) -> Result<ListMutation, Error> {
    Ok(match mutation {
        ListMutation::Insert { value, index } => ListMutation::Remove {
            value: value.clone(),
            index: *index,
        },
        ListMutation::Remove { value, index } => ListMutation::Insert {
            value: value.clone(),
            index: *index,
        },
        ListMutation::Patch {
            key,
            attrs,
            prior_attrs,
        } => {
            let prior = prior_attrs.clone().ok_or_else(|| {
                Error::NonInvertiblePatch(format!("{field}:{key:?}"))
            })?;
            ListMutation::Patch {
                key: key.clone(),
                attrs: prior,
                prior_attrs: Some(attrs.clone()),
            }
        }
    })
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
    fn apply_set_then_inverse_restores_original() {
        let mut entity = fieldset(&[("title", json!("T1"))]);
        let original = entity.clone();

        let mut changeset = FieldChangeset::new();
        changeset.insert("title".into(), ChangeOp::set(json!("T2"), json!("T1")));

        apply_changeset(&mut entity, &changeset).unwrap();
        assert_eq!(entity.get("title"), Some(&json!("T2")));

        let inverse = inverse_changeset(&changeset).unwrap();
        apply_changeset(&mut entity, &inverse).unwrap();
        assert_eq!(entity, original);
    }

    #[test]
    fn create_then_inverse_deletes() {
        let mut entity = Fieldset::new();
        let changeset: FieldChangeset =
            [("id".to_string(), ChangeOp::create(json!(1)))].into_iter().collect();

        apply_changeset(&mut entity, &changeset).unwrap();
        assert_eq!(entity.get("id"), Some(&json!(1)));

        let inverse = inverse_changeset(&changeset).unwrap();
        apply_changeset(&mut entity, &inverse).unwrap();
        assert!(entity.get("id").is_none());
    }

    #[test]
    fn seq_insert_then_inverse_removes() {
        let mut entity = fieldset(&[("tags", json!(["a"]))]);
        let original = entity.clone();

        let changeset: FieldChangeset = [(
            "tags".to_string(),
            ChangeOp::seq(vec![ListMutation::Insert {
                value: json!("b"),
                index: None,
            }]),
        )]
        .into_iter()
        .collect();

        apply_changeset(&mut entity, &changeset).unwrap();
        assert_eq!(entity.get("tags"), Some(&json!(["a", "b"])));

        let inverse = inverse_changeset(&changeset).unwrap();
        apply_changeset(&mut entity, &inverse).unwrap();
        assert_eq!(entity, original);
    }

    #[test]
    fn remove_with_mismatched_index_fails() {
        let mut entity = fieldset(&[("tags", json!(["a", "b"]))]);
        let changeset: FieldChangeset = [(
            "tags".to_string(),
            ChangeOp::seq(vec![ListMutation::Remove {
                value: json!("b"),
                index: Some(0),
            }]),
        )]
        .into_iter()
        .collect();

        assert!(apply_changeset(&mut entity, &changeset).is_err());
    }

    #[test]
    fn patch_without_prior_attrs_cannot_invert() {
        let changeset: FieldChangeset = [(
            "items".to_string(),
            ChangeOp::seq(vec![ListMutation::Patch {
                key: json!("x"),
                attrs: serde_json::Map::new(),
                prior_attrs: None,
            }]),
        )]
        .into_iter()
        .collect();

        assert!(inverse_changeset(&changeset).is_err());
    }

    #[test]
    fn patch_with_prior_attrs_inverts_cleanly() {
        let mut entity = fieldset(&[(
            "items",
            json!([{"key": "x", "done": false}]),
        )]);
        let original = entity.clone();

        let mut attrs = serde_json::Map::new();
        attrs.insert("done".into(), json!(true));
        let mut prior = serde_json::Map::new();
        prior.insert("done".into(), json!(false));

        let changeset: FieldChangeset = [(
            "items".to_string(),
            ChangeOp::seq(vec![ListMutation::Patch {
                key: json!("x"),
                attrs,
                prior_attrs: Some(prior),
            }]),
        )]
        .into_iter()
        .collect();

        apply_changeset(&mut entity, &changeset).unwrap();
        assert_eq!(entity.get("items"), Some(&json!([{"key": "x", "done": true}])));

        let inverse = inverse_changeset(&changeset).unwrap();
        apply_changeset(&mut entity, &inverse).unwrap();
        assert_eq!(entity, original);
    }
}
