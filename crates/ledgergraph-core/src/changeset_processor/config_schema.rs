//! `applyConfigChangesetToSchema` (spec.md §4.3): fold the *creating*
//! entries of a `config` changeset into a schema snapshot, so record
//! inputs in the same transaction validate against types/fields defined
//! earlier in that same batch.

use crate::algebra::{apply_changeset, EntitiesChangeset};
use crate::error::Error;
use crate::model::entity_type::{FieldAttrs, TypeFieldEntry};
use crate::model::field::DataType;
use crate::model::{FieldDef, Fieldset, NodeSchema, TypeDef};

/// The bootstrap schema for the `config` namespace itself: the fixed
/// field/type definitions for the two reserved config types, `Field` and
/// `Type` (spec.md §3). This is never stored as config rows — it would be
/// circular — so it's built in code once and handed to
/// [`crate::transaction::process_transaction_input`] as `configSchema`.
pub fn builtin_config_schema() -> NodeSchema {
    let required = |value: bool| FieldAttrs {
        required: Some(value),
        ..Default::default()
    };

    NodeSchema::new()
        .with_core_identity_fields()
        .with_field(FieldDef::new("dataType", DataType::Plaintext))
        .with_field(FieldDef::new("allowMultiple", DataType::Boolean))
        .with_field(FieldDef::new("unique", DataType::Boolean))
        .with_field(FieldDef::new("immutable", DataType::Boolean))
        .with_field(FieldDef::new("options", DataType::Json))
        .with_field(FieldDef::new("default", DataType::Json))
        .with_field(FieldDef::new("inverseOf", DataType::Plaintext))
        .with_field(FieldDef::new("when", DataType::Json))
        .with_field(FieldDef::new("format", DataType::Plaintext))
        .with_field(FieldDef::new("name", DataType::Plaintext))
        .with_field(FieldDef::new("extends", DataType::Plaintext))
        .with_field(FieldDef::new("fields", DataType::Json))
        .with_type(TypeDef::new("Field", "Field").with_fields(vec![
            TypeFieldEntry::with_attrs("dataType", required(true)),
            TypeFieldEntry::bare("allowMultiple"),
            TypeFieldEntry::bare("unique"),
            TypeFieldEntry::bare("immutable"),
            TypeFieldEntry::bare("options"),
            TypeFieldEntry::bare("default"),
            TypeFieldEntry::bare("inverseOf"),
            TypeFieldEntry::bare("when"),
            TypeFieldEntry::bare("format"),
        ]))
        .with_type(TypeDef::new("Type", "Type").with_fields(vec![
            TypeFieldEntry::with_attrs("name", required(true)),
            TypeFieldEntry::bare("extends"),
            TypeFieldEntry::with_attrs("fields", required(true)),
        ]))
}

/// Pure: does not touch the store. Only changesets whose `id` field is a
/// creating `set` (`previous` null, `value` non-null) are folded in —
/// updates/deletes to existing `Field`/`Type` rows are schema-cache
/// concerns handled by [`crate::schema_cache`], not by this function.
pub fn apply_config_changeset_to_schema(
    base: &NodeSchema,
    config_changeset: &EntitiesChangeset,
) -> Result<NodeSchema, Error> {
    let mut schema = base.clone();

    for changeset in config_changeset.values() {
        let is_create = matches!(
            changeset.get("id"),
            Some(crate::algebra::ChangeOp::Set { previous, value })
                if previous.is_null() && !value.is_null()
        );
        if !is_create {
            continue;
        }

        let mut fieldset = Fieldset::new();
        apply_changeset(&mut fieldset, changeset)?;

        match fieldset.get("type").and_then(|v| v.as_str()) {
            Some("Field") => {
                let field_def: crate::model::FieldDef = serde_json::from_value(
                    serde_json::Value::Object(fieldset),
                )
                .map_err(|e| Error::Schema(format!("invalid Field config row: {e}")))?;
                field_def
                    .is_schema_valid()
                    .map_err(Error::Schema)?;
                schema = schema.with_field(field_def);
            }
            Some("Type") => {
                let type_def: TypeDef = serde_json::from_value(serde_json::Value::Object(fieldset))
                    .map_err(|e| Error::Schema(format!("invalid Type config row: {e}")))?;
                schema = schema.with_type(type_def);
            }
            other => {
                return Err(Error::Schema(format!(
                    "unknown config row type: {other:?}"
                )))
            }
        }
    }

    Ok(schema)
}
