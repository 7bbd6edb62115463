//! Field definitions for the dynamic record schema.
//!
//! Grounded on `ormdb-core::catalog::field::FieldDef`/`DefaultValue`, but
//! flattened to the spec's closed `dataType` set and JSON-valued defaults
//! instead of a Rust-typed enum, since the schema itself lives in `config`
//! rows and is only known at runtime.

use ledgergraph_types::Value;
use serde::{Deserialize, Serialize};

/// Closed set of recognised `dataType` values (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    SeqId,
    Uid,
    Relation,
    Boolean,
    Integer,
    Decimal,
    Plaintext,
    Richtext,
    Date,
    DateTime,
    Period,
    Option,
    OptionSet,
    Object,
    Json,
    Query,
    FileHash,
    Interval,
    Duration,
    Uri,
    Image,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::SeqId => "seqId",
            DataType::Uid => "uid",
            DataType::Relation => "relation",
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Decimal => "decimal",
            DataType::Plaintext => "plaintext",
            DataType::Richtext => "richtext",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
            DataType::Period => "period",
            DataType::Option => "option",
            DataType::OptionSet => "optionSet",
            DataType::Object => "object",
            DataType::Json => "json",
            DataType::Query => "query",
            DataType::FileHash => "fileHash",
            DataType::Interval => "interval",
            DataType::Duration => "duration",
            DataType::Uri => "uri",
            DataType::Image => "image",
        }
    }
}

/// One allowed value for an `option`/`optionSet` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDef {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A predicate over sibling field values in the *same input*, used for
/// conditionally-required fields (`when`) on a [`FieldDef`] or a type's
/// per-field [`crate::model::entity_type::FieldAttrs`].
///
/// The spec leaves the predicate language unspecified beyond "a predicate
/// over sibling field values"; a single field/value equality check is
/// enough to express every example in spec.md (e.g. S3's
/// `status == "cancelled"`), so that's what's implemented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub field: String,
    pub equals: Value,
}

impl Condition {
    pub fn matches(&self, input: &serde_json::Map<String, Value>) -> bool {
        input
            .get(&self.field)
            .map(|v| ledgergraph_types::canonical_eq(v, &self.equals))
            .unwrap_or(false)
    }
}

/// Definition of one field in the dynamic schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub key: String,
    pub data_type: DataType,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub immutable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionDef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
    /// Named sub-format for `plaintext`/`richtext`/`period` (e.g. `day`,
    /// `month`). Empty per spec.md §4.2 when not applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl FieldDef {
    pub fn new(key: impl Into<String>, data_type: DataType) -> Self {
        Self {
            key: key.into(),
            data_type,
            allow_multiple: false,
            unique: false,
            immutable: false,
            options: None,
            default: None,
            inverse_of: None,
            when: None,
            format: None,
        }
    }

    /// Schema-acceptance-time rule: `unique` + `allowMultiple` together are
    /// rejected (spec.md §4.3 step 6).
    pub fn is_schema_valid(&self) -> Result<(), String> {
        if self.unique && self.allow_multiple {
            return Err(format!(
                "field '{}' cannot be both unique and allowMultiple",
                self.key
            ));
        }
        Ok(())
    }
}

/// The identity fields every entity carries regardless of its type
/// (spec.md §3: "core identity field set").
pub fn is_identity_field(key: &str) -> bool {
    matches!(key, "id" | "uid" | "key" | "type" | "txIds")
}

/// Fields user input may never set directly (spec.md §4.3 step 1).
pub fn is_forbidden_input_field(key: &str) -> bool {
    matches!(key, "id" | "txIds")
}
