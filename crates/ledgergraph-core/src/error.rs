//! Core error types.
//!
//! Mirrors the teacher's layering: a top-level [`Error`] that wraps storage
//! errors via `#[from]`, plus a couple of structured payload types used by
//! the changeset processor to report every failing input in one shot
//! instead of stopping at the first problem.

use thiserror::Error;

use crate::model::Namespace;
use crate::store::StoreError;

/// One field-level failure discovered while processing a batch of
/// changeset inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Position of the offending input within the batch.
    pub index: usize,
    /// Namespace the input targeted.
    pub namespace: Namespace,
    /// Field key the error concerns, if any (a whole-input error, such as
    /// an unknown `type`, has no single field).
    pub field: Option<String>,
    /// Human-readable explanation.
    pub message: String,
}

impl FieldError {
    pub fn new(
        index: usize,
        namespace: Namespace,
        field: impl Into<Option<String>>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            index,
            namespace,
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Core database errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A list mutation (`insert`/`remove`/`patch`) could not be applied.
    #[error("list mutation failed: {0}")]
    ListMutation(String),

    /// A `patch` mutation's inverse was requested but no prior attributes
    /// were captured for it. Per design, this only happens for a patch
    /// built directly rather than assembled by the changeset processor.
    #[error("cannot invert patch without captured prior attributes for key {0}")]
    NonInvertiblePatch(String),

    /// One or more inputs in a batch failed validation. Carries every
    /// failure, not just the first.
    #[error("{} input(s) failed validation", .errors.len())]
    ChangesetInputProcessFailed { errors: Vec<FieldError> },

    /// A system-managed field (`id`, `txIds`) was present in user input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `rollback` was called with `count < 1` or `count` greater than the
    /// current tip id.
    #[error("invalid rollback: {0}")]
    InvalidRollback(String),

    /// `rollback` was called with an `expectedVersion` that no longer
    /// matches the tip.
    #[error("version mismatch: expected tip {expected}, found {actual}")]
    VersionMismatch { expected: u64, actual: u64 },

    /// Referenced entity does not exist.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// The dynamic schema itself is inconsistent (unknown type, cyclic
    /// `extends`, conflicting field definition).
    #[error("schema error: {0}")]
    Schema(String),
}

impl Error {
    /// Build the aggregate batch error from a non-empty list of field
    /// errors. Panics if `errors` is empty — callers should never produce
    /// this error unless they actually have something to report.
    pub fn batch(errors: Vec<FieldError>) -> Self {
        debug_assert!(!errors.is_empty(), "batch error requires at least one failure");
        Error::ChangesetInputProcessFailed { errors }
    }
}
