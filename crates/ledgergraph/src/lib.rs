//! ledgergraph — the public facade over [`ledgergraph_core`]: a single
//! `Db` handle exposing exactly the operations spec.md §6 names
//! (`update`, `apply`, `rollback`, `version`, `fetch_entity`, `search`,
//! `get_node_schema`, `get_config_schema`), serialized behind one lock
//! standing in for "one storage transaction" per spec.md §5.
//!
//! This crate wires [`ledgergraph_core`]'s changeset/transaction
//! processors to a concrete [`EntityStore`] and adds the ambient pieces a
//! standalone, runnable crate needs: a `Config` (clock, batch-size limit,
//! genesis hash override), and a reference [`QueryExecutor`] so `search`
//! works out of the box against [`ledgergraph_core::store::MemoryEntityStore`]
//! without pulling in the (out-of-scope) SQL query compiler.

pub mod clock;
pub mod db;
pub mod query;

pub use clock::{Clock, FixedClock, SystemClock};
pub use db::{Config, Db};
pub use query::{FilterQueryExecutor, QueryExecutor, SearchResult};

pub use ledgergraph_core::{
    apply_and_save_transaction, apply_transaction, process_transaction_input,
    rollback_transaction, DataType, Entity, EntityId, EntityRef, EntityStore, Error, FieldDef,
    Fieldset, MemoryEntityStore, Namespace, NoopCallbacks, NodeSchema, StoreError,
    StoredTransaction, Transaction, TransactionCallbacks, TransactionInput, TypeDef, Uid, Version,
};
