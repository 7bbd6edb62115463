//! Turns [`EntityChangesetInput`]s into an [`EntitiesChangeset`] for one
//! namespace (spec.md §4.3) — the largest single component, grounded on
//! `ormdb-core::constraint::validator::ConstraintValidator`'s
//! validate-then-assemble shape but driven by the dynamic schema instead
//! of compiled Rust types.

pub mod assemble;
pub mod config_schema;
pub mod defaults;
pub mod input;
pub mod inverse_fields;
pub mod relation_resolve;
pub mod uniqueness;

pub use assemble::process_changesets;
pub use config_schema::{apply_config_changeset_to_schema, builtin_config_schema};
pub use input::EntityChangesetInput;

/// One input-level failure, not yet tagged with its batch index or
/// namespace (that happens in [`assemble`] once the failure is known to
/// belong to a specific input).
#[derive(Debug, Clone, PartialEq)]
pub struct ProcItemError {
    pub field: Option<String>,
    pub message: String,
}

impl ProcItemError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn whole(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

impl From<crate::validate::ValidationError> for ProcItemError {
    fn from(e: crate::validate::ValidationError) -> Self {
        ProcItemError::whole(e.to_string())
    }
}
