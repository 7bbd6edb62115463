//! `relation` dataType validation (spec.md §4.2): either a bare non-empty
//! `uid`/`key` string, or a `[ref, attrs]` tuple where `attrs` is a plain
//! object.

use ledgergraph_types::Value;

use super::ValidationError;

pub fn validate_relation_value(value: &Value) -> Result<(), ValidationError> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(()),
        Value::String(_) => Err(ValidationError::new("relation value must be a non-empty key or uid")),
        Value::Array(items) => {
            if items.len() != 2 {
                return Err(ValidationError::new(
                    "relation tuple must be [ref, attrs]",
                ));
            }
            if !items[0].is_string() {
                return Err(ValidationError::new("relation tuple's first element must be a uid/key string"));
            }
            if !items[1].is_object() {
                return Err(ValidationError::new("relation tuple's second element must be an object"));
            }
            Ok(())
        }
        _ => Err(ValidationError::new(
            "relation value must be a uid/key string or a [ref, attrs] tuple",
        )),
    }
}
