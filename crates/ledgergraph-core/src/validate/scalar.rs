//! Per-`dataType` value validators (spec.md §4.2).
//!
//! Grounded on `ormdb-core::constraint::check_evaluator`'s per-type
//! dispatch, but operating on `serde_json::Value` directly instead of the
//! teacher's closed `Value` enum, since field values here are already
//! JSON.

use chrono::{DateTime, NaiveDate};
use ledgergraph_types::Value;

use crate::model::{DataType, FieldDef};

use super::ValidationError;

/// Validate `value` against `field`'s `dataType`, honouring `allowMultiple`
/// by wrapping the per-element check. `relation`/`query` get their own
/// dedicated validators elsewhere in this module's siblings; everything
/// else is dispatched here.
pub fn validate_value(value: &Value, field: &FieldDef) -> Result<(), ValidationError> {
    if field.allow_multiple {
        let items = match value {
            Value::Array(items) => items.as_slice(),
            other => return validate_multiple(std::slice::from_ref(other), field),
        };
        return validate_multiple(items, field);
    }
    validate_scalar(value, field)
}

fn validate_multiple(items: &[Value], field: &FieldDef) -> Result<(), ValidationError> {
    for (index, item) in items.iter().enumerate() {
        validate_scalar(item, field).map_err(|e| e.at_index(index))?;
    }
    Ok(())
}

fn validate_scalar(value: &Value, field: &FieldDef) -> Result<(), ValidationError> {
    match field.data_type {
        DataType::SeqId => expect(value.is_u64(), "expected a non-negative integer"),
        DataType::Uid => {
            let s = expect_str(value)?;
            if crate::model::identifiers::Uid::parse(s).is_some() {
                Ok(())
            } else {
                Err(ValidationError::new("value is not a valid uid"))
            }
        }
        DataType::Relation => super::relation::validate_relation_value(value),
        DataType::Boolean => expect(value.is_boolean(), "expected a boolean"),
        DataType::Integer => expect(value.is_i64() || value.is_u64(), "expected an integer"),
        DataType::Decimal => expect(value.is_f64() || value.is_i64() || value.is_u64(), "expected a finite number")
            .and_then(|_| {
                if let Some(f) = value.as_f64() {
                    expect(f.is_finite(), "expected a finite number")
                } else {
                    Ok(())
                }
            }),
        DataType::Plaintext | DataType::Richtext => validate_text(value, field),
        DataType::Date => validate_date(value),
        DataType::DateTime => validate_datetime(value),
        DataType::Period => validate_period(value, field),
        DataType::Option => validate_option(value, field),
        DataType::OptionSet => validate_option_set(value, field),
        DataType::Object => expect(value.is_object(), "expected an object"),
        DataType::Json => Ok(()),
        DataType::Query => super::query_params::validate_query_params(value),
        DataType::FileHash => expect_str(value).map(|_| ()),
        DataType::Interval | DataType::Duration => expect_str(value).map(|_| ()),
        DataType::Uri => {
            let s = expect_str(value)?;
            expect(!s.is_empty(), "expected a non-empty uri")
        }
        DataType::Image => expect_str(value).map(|_| ()),
    }
}

fn validate_text(value: &Value, _field: &FieldDef) -> Result<(), ValidationError> {
    // Empty string is always accepted, per spec.md §4.2.
    expect_str(value).map(|_| ())
}

fn validate_date(value: &Value) -> Result<(), ValidationError> {
    let s = expect_str(value)?;
    if s.is_empty() {
        return Ok(());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ValidationError::new("expected an ISO 8601 date"))
}

fn validate_datetime(value: &Value) -> Result<(), ValidationError> {
    let s = expect_str(value)?;
    if s.is_empty() {
        return Ok(());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|_| ())
        .map_err(|_| ValidationError::new("expected an ISO 8601 datetime"))
}

fn validate_period(value: &Value, field: &FieldDef) -> Result<(), ValidationError> {
    let s = expect_str(value)?;
    if s.is_empty() {
        return Ok(());
    }
    match field.format.as_deref() {
        Some("day") => validate_date(value),
        Some("month") => {
            let parts: Vec<&str> = s.split('-').collect();
            expect(
                parts.len() == 2 && parts[0].len() == 4 && parts[1].len() == 2,
                "expected a YYYY-MM period",
            )
        }
        _ => Ok(()),
    }
}

fn validate_option(value: &Value, field: &FieldDef) -> Result<(), ValidationError> {
    let s = expect_str(value)?;
    let options = field
        .options
        .as_ref()
        .ok_or_else(|| ValidationError::new("field has no declared options"))?;
    if options.iter().any(|o| o.key == s) {
        Ok(())
    } else {
        Err(ValidationError::new(format!(
            "'{s}' is not one of the field's declared options"
        )))
    }
}

fn validate_option_set(value: &Value, field: &FieldDef) -> Result<(), ValidationError> {
    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::new("expected an array of option keys"))?;
    for (index, item) in items.iter().enumerate() {
        validate_option(item, field).map_err(|e| e.at_index(index))?;
    }
    Ok(())
}

fn expect(condition: bool, message: &str) -> Result<(), ValidationError> {
    if condition {
        Ok(())
    } else {
        Err(ValidationError::new(message))
    }
}

fn expect_str(value: &Value) -> Result<&str, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| ValidationError::new("expected a string"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OptionDef;
    use serde_json::json;

    #[test]
    fn integer_accepts_whole_numbers_only() {
        let field = FieldDef::new("count", DataType::Integer);
        assert!(validate_value(&json!(3), &field).is_ok());
        assert!(validate_value(&json!("3"), &field).is_err());
    }

    #[test]
    fn decimal_rejects_non_finite() {
        let field = FieldDef::new("ratio", DataType::Decimal);
        assert!(validate_value(&json!(1.5), &field).is_ok());
        assert!(validate_value(&json!(f64::NAN), &field).is_err());
    }

    #[test]
    fn option_must_match_declared_key() {
        let mut field = FieldDef::new("status", DataType::Option);
        field.options = Some(vec![OptionDef {
            key: "open".into(),
            label: None,
        }]);
        assert!(validate_value(&json!("open"), &field).is_ok());
        assert!(validate_value(&json!("closed"), &field).is_err());
    }

    #[test]
    fn allow_multiple_validates_each_element_and_indexes_errors() {
        let mut field = FieldDef::new("tags", DataType::Plaintext);
        field.allow_multiple = true;
        assert!(validate_value(&json!(["a", "b"]), &field).is_ok());

        let mut int_field = FieldDef::new("scores", DataType::Integer);
        int_field.allow_multiple = true;
        let err = validate_value(&json!([1, "x", 3]), &int_field).unwrap_err();
        assert_eq!(err.index, Some(1));
    }

    #[test]
    fn empty_string_always_accepted_for_text_types() {
        let field = FieldDef::new("notes", DataType::Richtext);
        assert!(validate_value(&json!(""), &field).is_ok());
    }

    #[test]
    fn date_rejects_malformed_strings() {
        let field = FieldDef::new("due", DataType::Date);
        assert!(validate_value(&json!("2024-01-15"), &field).is_ok());
        assert!(validate_value(&json!("not-a-date"), &field).is_err());
    }
}
