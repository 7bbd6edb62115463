//! ledgergraph-core — the changeset processor, transaction processor, and
//! schema model described in spec.md: a transactional, schema-driven
//! entity store with a hash-chained transaction log and reversible
//! updates.
//!
//! This crate owns the algebra and the validation/assembly rules; it
//! depends only on the [`store::EntityStore`] trait for persistence, never
//! a concrete backend. [`store::MemoryEntityStore`] is provided so the
//! crate is runnable and testable standalone.

pub mod algebra;
pub mod changeset_processor;
pub mod error;
pub mod model;
pub mod schema_cache;
pub mod store;
pub mod transaction;
pub mod validate;
pub mod version;

pub use changeset_processor::builtin_config_schema;
pub use error::{Error, FieldError};
pub use model::{
    DataType, Entity, EntityId, EntityRef, FieldDef, Fieldset, Namespace, NodeSchema, TypeDef, Uid,
};
pub use schema_cache::SchemaCache;
pub use store::{EntityStore, MemoryEntityStore, StoreError, StoredTransaction};
pub use transaction::{
    apply_and_save_transaction, apply_transaction, process_transaction_input,
    rollback_transaction, NoopCallbacks, Transaction, TransactionCallbacks, TransactionInput,
};
pub use version::Version;
