//! Input shapes accepted by the changeset processor (spec.md §4.3).

use ledgergraph_types::Value;

use crate::algebra::ListMutation;
use crate::model::EntityRef;

/// One entity's worth of user-submitted edits.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityChangesetInput {
    /// `{type, <field>: value, …, key?, uid?}`.
    Create {
        type_key: String,
        fields: serde_json::Map<String, Value>,
    },
    /// `{$ref: EntityRef, <field>: value | [listMutation, …], …}`.
    Update {
        reference: EntityRef,
        fields: serde_json::Map<String, Value>,
    },
}

impl EntityChangesetInput {
    pub fn fields(&self) -> &serde_json::Map<String, Value> {
        match self {
            EntityChangesetInput::Create { fields, .. } => fields,
            EntityChangesetInput::Update { fields, .. } => fields,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, EntityChangesetInput::Create { .. })
    }
}

const MUTATION_OPS: [&str; 3] = ["insert", "remove", "patch"];

/// A raw field value is either a plain replacement value, or — when every
/// element looks like a `[op, …]` tuple — a list of mutations to fold as a
/// `seq` changeset. This mirrors the wire shape in spec.md §3
/// (`ListMutation = ["insert", value, index?] | …`), which is distinct
/// from this crate's internal, struct-shaped [`ListMutation`].
pub enum RawFieldValue<'a> {
    Value(&'a Value),
    Mutations(Vec<&'a Value>),
}

pub fn classify_raw_value(value: &Value) -> RawFieldValue<'_> {
    if let Value::Array(items) = value {
        if !items.is_empty() && items.iter().all(looks_like_mutation_tuple) {
            return RawFieldValue::Mutations(items.iter().collect());
        }
    }
    RawFieldValue::Value(value)
}

fn looks_like_mutation_tuple(value: &Value) -> bool {
    match value.as_array() {
        Some(items) if (2..=3).contains(&items.len()) => items[0]
            .as_str()
            .map(|op| MUTATION_OPS.contains(&op))
            .unwrap_or(false),
        _ => false,
    }
}

/// Parse one `[op, …]` tuple into this crate's internal [`ListMutation`].
/// `prior_attrs` is always `None` here — it is filled in later by
/// [`super::assemble`] once the processor knows the entity's current
/// state, matching spec.md §9's note that prior attrs are captured only
/// when assembling *update* changesets.
pub fn parse_raw_mutation(tuple: &Value) -> Result<ListMutation, String> {
    let items = tuple
        .as_array()
        .ok_or_else(|| "list mutation must be an array".to_string())?;
    let op = items
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| "list mutation missing op".to_string())?;

    match op {
        "insert" => {
            let value = items
                .get(1)
                .cloned()
                .ok_or_else(|| "insert mutation missing value".to_string())?;
            let index = items.get(2).and_then(Value::as_u64).map(|i| i as usize);
            Ok(ListMutation::Insert { value, index })
        }
        "remove" => {
            let value = items
                .get(1)
                .cloned()
                .ok_or_else(|| "remove mutation missing value".to_string())?;
            let index = items.get(2).and_then(Value::as_u64).map(|i| i as usize);
            Ok(ListMutation::Remove { value, index })
        }
        "patch" => {
            let key = items
                .get(1)
                .cloned()
                .ok_or_else(|| "patch mutation missing key".to_string())?;
            let attrs = items
                .get(2)
                .and_then(Value::as_object)
                .cloned()
                .ok_or_else(|| "patch mutation missing attrs object".to_string())?;
            Ok(ListMutation::Patch {
                key,
                attrs,
                prior_attrs: None,
            })
        }
        other => Err(format!("unknown list mutation op '{other}'")),
    }
}
