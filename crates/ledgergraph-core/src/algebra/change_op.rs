//! The two change operators, `set` and `seq` (spec.md §3, §4.1).

use ledgergraph_types::{is_nullish, Value};
use serde::{Deserialize, Serialize};

/// One ordered-list edit within a `seq` changeset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ListMutation {
    /// Insert `value` at `index` (append if absent).
    Insert {
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// Remove the first occurrence matching `value`. If `index` is also
    /// given it is advisory and must agree with where `value` is found —
    /// disagreement fails validation (spec.md §9 open question).
    Remove {
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// Shallow-merge `attrs` into the list item identified by `key`
    /// (matched against each item's `"key"` property). `prior_attrs`, when
    /// present, holds the attribute values being overwritten and is what
    /// makes the mutation invertible; it is populated by the changeset
    /// processor when assembling an update, never by a hand-built
    /// changeset (spec.md §9 design note).
    Patch {
        key: Value,
        attrs: serde_json::Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prior_attrs: Option<serde_json::Map<String, Value>>,
    },
}

/// A field-level change: whole-value replacement (`set`) or ordered-list
/// editing (`seq`).
///
/// `Set`'s `value`/`previous` use JSON `null` as the sentinel for both
/// "explicitly null" and "absent/undefined" — spec.md §4.1's own apply
/// rule ("deleting the key if v is null/undefined") treats the two
/// identically, so collapsing them costs nothing and keeps the type
/// plain-JSON-serializable for canonical hashing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChangeOp {
    Set {
        #[serde(default)]
        value: Value,
        #[serde(default)]
        previous: Value,
    },
    Seq {
        mutations: Vec<ListMutation>,
    },
}

impl ChangeOp {
    pub fn set(value: Value, previous: Value) -> Self {
        ChangeOp::Set { value, previous }
    }

    /// A `set` representing entity/field creation: no previous value.
    pub fn create(value: Value) -> Self {
        ChangeOp::Set {
            value,
            previous: Value::Null,
        }
    }

    /// A `set` representing entity/field deletion: no new value.
    pub fn delete(previous: Value) -> Self {
        ChangeOp::Set {
            value: Value::Null,
            previous,
        }
    }

    pub fn seq(mutations: Vec<ListMutation>) -> Self {
        ChangeOp::Seq { mutations }
    }
}

/// True if a `Set`'s `value` represents "no value" (apply should delete
/// the key rather than assign `null`).
pub fn set_effective_value(value: &Value) -> Option<&Value> {
    if is_nullish(value) {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_has_null_previous() {
        let op = ChangeOp::create(json!(42));
        match op {
            ChangeOp::Set { value, previous } => {
                assert_eq!(value, json!(42));
                assert!(previous.is_null());
            }
            _ => panic!("expected Set"),
        }
    }

    #[test]
    fn set_effective_value_treats_null_as_absent() {
        assert!(set_effective_value(&Value::Null).is_none());
        assert_eq!(set_effective_value(&json!(1)), Some(&json!(1)));
    }
}
