//! Create-time mandatory-field checking, conditional `when` requirements,
//! defaults, and fixed `value` constraints (spec.md §4.3 step 3).

use ledgergraph_types::Value;

use crate::model::{NodeSchema, TypeDef};

use super::ProcItemError;

/// Apply step 3 of the create algorithm in place on `fields`:
/// - every mandatory field (required on the type or an ancestor, subject
///   to its `when` condition) must be present and non-null;
/// - a missing, non-mandatory field gets its type-level `default`, then
///   its field-level `default`, but only when its `when` condition (if
///   any) matches or is absent;
/// - a field with a fixed `value` constraint is forced to that value
///   regardless of what the caller supplied.
pub fn apply_create_defaults(
    schema: &NodeSchema,
    type_def: &TypeDef,
    fields: &mut serde_json::Map<String, Value>,
) -> Result<(), Vec<ProcItemError>> {
    let merged = schema
        .merged_field_attrs(&type_def.key)
        .map_err(|e| vec![ProcItemError::whole(e.to_string())])?;
    let mut errors = Vec::new();

    for (field_key, attrs) in &merged {
        let when_matches = attrs.when.as_ref().map(|c| c.matches(fields)).unwrap_or(true);

        if let Some(fixed) = &attrs.value {
            fields.insert(field_key.clone(), fixed.clone());
            continue;
        }

        let is_mandatory = attrs.required == Some(true) && when_matches;
        let present = fields.get(field_key).map(|v| !v.is_null()).unwrap_or(false);

        if present {
            continue;
        }

        if is_mandatory {
            errors.push(ProcItemError::field(
                field_key,
                "mandatory property is missing or null",
            ));
            continue;
        }

        if !when_matches {
            continue;
        }

        if let Some(default) = &attrs.default {
            fields.insert(field_key.clone(), default.clone());
        } else if let Some(field_def) = schema.get_field(field_key) {
            if let Some(default) = &field_def.default {
                fields.insert(field_key.clone(), default.clone());
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
