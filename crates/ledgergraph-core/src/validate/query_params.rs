//! `query` dataType validation (spec.md §4.2): a minimal structural check
//! that a value parses as `{filters?, pagination?: {limit?, cursor?},
//! includes?: [String]}` — enough to satisfy "must parse as a structural
//! query params object" without the (out-of-scope) query compiler itself.

use ledgergraph_types::Value;

use super::ValidationError;

pub fn validate_query_params(value: &Value) -> Result<(), ValidationError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::new("query value must be an object"))?;

    if let Some(filters) = obj.get("filters") {
        if !filters.is_object() {
            return Err(ValidationError::new("query.filters must be an object"));
        }
    }

    if let Some(pagination) = obj.get("pagination") {
        let pagination = pagination
            .as_object()
            .ok_or_else(|| ValidationError::new("query.pagination must be an object"))?;
        if let Some(limit) = pagination.get("limit") {
            if !limit.is_u64() {
                return Err(ValidationError::new("query.pagination.limit must be a non-negative integer"));
            }
        }
        if let Some(cursor) = pagination.get("cursor") {
            if !cursor.is_string() {
                return Err(ValidationError::new("query.pagination.cursor must be a string"));
            }
        }
    }

    if let Some(includes) = obj.get("includes") {
        let items = includes
            .as_array()
            .ok_or_else(|| ValidationError::new("query.includes must be an array"))?;
        if !items.iter().all(Value::is_string) {
            return Err(ValidationError::new("query.includes must be an array of strings"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_is_valid() {
        assert!(validate_query_params(&json!({})).is_ok());
    }

    #[test]
    fn well_formed_query_is_valid() {
        let q = json!({
            "filters": {"type": "Task"},
            "pagination": {"limit": 10, "cursor": "abc"},
            "includes": ["project"],
        });
        assert!(validate_query_params(&q).is_ok());
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(validate_query_params(&json!("not an object")).is_err());
    }

    #[test]
    fn wrong_shaped_pagination_is_rejected() {
        let q = json!({"pagination": {"limit": "ten"}});
        assert!(validate_query_params(&q).is_err());
    }
}
