//! Uniqueness checking (spec.md §4.3 step 6).

use ledgergraph_types::Value;

use crate::model::{EntityRef, Namespace};
use crate::store::EntityStore;

use super::ProcItemError;

/// Error if another entity in `ns` already has `field == value`, other
/// than `current` (the entity being updated, absent for creates).
pub fn check_unique(
    store: &dyn EntityStore,
    ns: Namespace,
    field: &str,
    value: &Value,
    current: Option<&EntityRef>,
) -> Result<(), ProcItemError> {
    if value.is_null() {
        return Ok(());
    }
    if store
        .find_conflicting_unique(ns, field, value, current)
        .is_some()
    {
        return Err(ProcItemError::field(
            field,
            "value must be unique, already exists on another entity",
        ));
    }
    Ok(())
}
