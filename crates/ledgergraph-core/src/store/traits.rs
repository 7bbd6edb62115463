//! The `EntityStore` seam (spec.md §6): the only interface the core
//! depends on for persistence. Grounded on
//! `ormdb-core::storage::engine::StorageEngine`'s trait-for-the-backing-
//! store role, but scoped to exactly the method list spec.md §6 names —
//! the real SQL row store is an external collaborator, out of scope here.

use ledgergraph_types::Value;
use thiserror::Error;

use crate::model::{Entity, EntityId, EntityRef, Fieldset, Namespace};
use crate::version::Version;

/// Errors surfaced by an [`EntityStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity not found in namespace '{namespace}': {reference}")]
    NotFound {
        namespace: Namespace,
        reference: String,
    },

    #[error("entity ref '{reference}' is ambiguous or unresolvable in namespace '{namespace}'")]
    UnresolvableRef {
        namespace: Namespace,
        reference: String,
    },

    #[error("no transaction found for ref '{0}'")]
    TransactionNotFound(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Abstract CRUD over the two editable namespaces plus the transaction
/// log, reproduced verbatim (method-for-method) from spec.md §6.
pub trait EntityStore: Send + Sync {
    fn fetch_entity_fieldset(
        &self,
        ns: Namespace,
        reference: &EntityRef,
        keys: &[String],
    ) -> Result<Fieldset, StoreError>;

    fn fetch_entity(&self, ns: Namespace, reference: &EntityRef) -> Result<Entity, StoreError>;

    fn create_entity(&self, ns: Namespace, fieldset: Fieldset) -> Result<Entity, StoreError>;

    fn update_entity(
        &self,
        ns: Namespace,
        reference: &EntityRef,
        patch: &Fieldset,
    ) -> Result<Entity, StoreError>;

    fn delete_entity(&self, ns: Namespace, reference: &EntityRef) -> Result<(), StoreError>;

    fn entity_exists(&self, ns: Namespace, reference: &EntityRef) -> bool;

    /// Resolve each of `refs` to its `uid`, in order. A ref that doesn't
    /// resolve yields `None` at its position rather than failing the
    /// whole batch, so callers can report which ref was unresolvable.
    fn resolve_entity_refs(&self, ns: Namespace, refs: &[EntityRef]) -> Vec<Option<String>>;

    fn get_last_entity_id(&self, ns: Namespace) -> EntityId;

    /// List every entity in `ns` whose `type` equals `type_key`. Beyond
    /// spec.md §6's literal method list, but grounded on the same
    /// section's persisted-layout note that every editable entity table
    /// carries an index on `type` — the schema cache (§4.5) needs exactly
    /// this to rebuild the record schema from `Field`/`Type` config rows.
    fn list_by_type(&self, ns: Namespace, type_key: &str) -> Vec<Entity>;

    /// Find another entity in `ns` with `field == value`, excluding
    /// `exclude` (the entity being updated, if any). Used for uniqueness
    /// checks (spec.md §4.3 step 6).
    fn find_conflicting_unique(
        &self,
        ns: Namespace,
        field: &str,
        value: &Value,
        exclude: Option<&EntityRef>,
    ) -> Option<Entity>;

    fn get_version(&self) -> Version;

    fn fetch_transaction(&self, reference: &EntityRef) -> Result<StoredTransaction, StoreError>;

    fn save_transaction(&self, transaction: StoredTransaction) -> Result<(), StoreError>;

    /// Delete transaction rows with `id > keep_below` (i.e. the most
    /// recent `count` rows), used by rollback.
    fn delete_transactions_above(&self, keep_below: u64);
}

/// The persisted shape of a transaction row (spec.md §6's `transactions`
/// table). Kept separate from [`crate::transaction::Transaction`] so the
/// store boundary only ever sees plain, already-hashed data.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredTransaction {
    pub id: u64,
    pub hash: String,
    pub previous: String,
    pub configs: crate::algebra::EntitiesChangeset,
    pub records: crate::algebra::EntitiesChangeset,
    pub author: String,
    pub created_at: String,
}
