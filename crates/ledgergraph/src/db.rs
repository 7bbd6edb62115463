//! `Db`: the single entry point an embedding application talks to.
//! Grounded on `ormdb-core::storage::engine::StorageEngine` for the
//! "one struct wraps the backend, every public method is a short
//! orchestration over it" shape, and on `StorageConfig` for the
//! plain-struct-with-`Default`-impl config pattern.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, instrument};

use ledgergraph_core::{
    apply_and_save_transaction, builtin_config_schema, process_transaction_input,
    rollback_transaction, Entity, EntityRef, EntityStore, Error, MemoryEntityStore, Namespace,
    NoopCallbacks, NodeSchema, SchemaCache, Transaction, TransactionCallbacks, TransactionInput,
    Version,
};
use ledgergraph_types::Value;

use crate::clock::{Clock, SystemClock};
use crate::query::{FilterQueryExecutor, QueryExecutor, SearchResult};

/// Ambient configuration for a [`Db`] instance.
///
/// `genesis_hash` lets an embedder pin the hash a fresh log chains its
/// first transaction from (spec.md §4.4 always uses the literal
/// `"0"*64` constant; this just makes that an overridable default
/// rather than hardcoding the constant into `Db` itself).
#[derive(Clone)]
pub struct Config {
    pub genesis_hash: String,
    pub max_batch_size: usize,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("genesis_hash", &self.genesis_hash)
            .field("max_batch_size", &self.max_batch_size)
            .field("clock", &self.clock)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            genesis_hash: ledgergraph_core::algebra::GENESIS_HASH.to_string(),
            max_batch_size: 1_000,
            clock: Arc::new(SystemClock),
        }
    }
}

/// The embedded knowledge-graph store. Cheap to clone-by-reference
/// (wrap in an `Arc` at the call site); internally serializes writes
/// behind one lock, standing in for "one storage transaction at a
/// time" (spec.md §5).
pub struct Db {
    store: Arc<dyn EntityStore>,
    schema_cache: SchemaCache,
    config_schema: NodeSchema,
    callbacks: Arc<dyn TransactionCallbacks>,
    query_executor: Arc<dyn QueryExecutor>,
    config: Config,
    write_lock: Mutex<()>,
}

impl Db {
    /// An in-memory `Db` with every ambient piece defaulted: no
    /// transaction callbacks, the reference [`FilterQueryExecutor`],
    /// and [`Config::default`]. The quickest way to get a runnable
    /// store for tests or a REPL.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryEntityStore::new()),
            Config::default(),
            Arc::new(NoopCallbacks),
            Arc::new(FilterQueryExecutor),
        )
    }

    pub fn new(
        store: Arc<dyn EntityStore>,
        config: Config,
        callbacks: Arc<dyn TransactionCallbacks>,
        query_executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        Self {
            store,
            schema_cache: SchemaCache::new(),
            config_schema: builtin_config_schema(),
            callbacks,
            query_executor,
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Submit a new batch of config/record edits and commit it as the
    /// next transaction (spec.md §4.4's `update`).
    #[instrument(skip(self, input), fields(author = %input.author))]
    pub fn update(&self, input: TransactionInput) -> Result<Transaction, Error> {
        let batch_size = input.configs.len() + input.records.len();
        if batch_size > self.config.max_batch_size {
            return Err(Error::InvalidInput(format!(
                "batch of {batch_size} inputs exceeds max_batch_size {}",
                self.config.max_batch_size
            )));
        }

        let _guard = self.write_lock.lock();

        let node_schema = self.schema_cache.get_or_rebuild(self.store.as_ref())?;
        let created_at = self.config.clock.now_rfc3339();

        let transaction = process_transaction_input(
            self.store.as_ref(),
            &node_schema,
            &self.config_schema,
            &input,
            &created_at,
            &self.config.genesis_hash,
        )?;

        self.commit(transaction)
    }

    /// Apply an already-assembled transaction (e.g. one replayed from
    /// another replica) rather than deriving one from raw input.
    /// Rejects a transaction whose `id`/`previous`/`hash` no longer
    /// line up with the current tip.
    #[instrument(skip(self, transaction), fields(id = transaction.id))]
    pub fn apply(&self, transaction: Transaction) -> Result<Transaction, Error> {
        let _guard = self.write_lock.lock();

        let tip = self.store.get_version();
        if transaction.id != tip.id + 1 {
            return Err(Error::VersionMismatch {
                expected: tip.id + 1,
                actual: transaction.id,
            });
        }
        let expected_previous = if tip.is_genesis() {
            self.config.genesis_hash.clone()
        } else {
            tip.hash.clone()
        };
        if transaction.previous != expected_previous {
            return Err(Error::InvalidInput(format!(
                "transaction {} does not chain from the current tip",
                transaction.id
            )));
        }

        let recomputed = ledgergraph_core::algebra::transaction_hash(
            &transaction.previous,
            &transaction.author,
            &transaction.created_at,
            &transaction.configs,
            &transaction.records,
        )?;
        if recomputed != transaction.hash {
            return Err(Error::InvalidInput(format!(
                "transaction {} hash does not match its recomputed hash",
                transaction.id
            )));
        }

        self.commit(transaction)
    }

    fn commit(&self, transaction: Transaction) -> Result<Transaction, Error> {
        let has_config_changes = !transaction.configs.is_empty();
        let rollback_hook = self.callbacks.before_transaction(&transaction);

        match apply_and_save_transaction(self.store.as_ref(), self.callbacks.as_ref(), transaction) {
            Ok(committed) => {
                if has_config_changes {
                    debug!("invalidating schema cache after config-bearing commit");
                    self.schema_cache.invalidate();
                }
                Ok(committed)
            }
            Err(err) => {
                if let Some(undo) = rollback_hook {
                    undo();
                }
                Err(err)
            }
        }
    }

    /// Roll back the most recent `count` committed transactions.
    /// `expected_version` guards against a racing writer having moved
    /// the tip since the caller last observed it.
    #[instrument(skip(self))]
    pub fn rollback(&self, count: u64, expected_version: u64) -> Result<Vec<Transaction>, Error> {
        let _guard = self.write_lock.lock();

        let reverted = rollback_transaction(self.store.as_ref(), self.callbacks.as_ref(), count, expected_version)?;
        debug!("invalidating schema cache after rollback");
        self.schema_cache.invalidate();
        Ok(reverted)
    }

    /// The current log tip.
    pub fn version(&self) -> Version {
        self.store.get_version()
    }

    /// Fetch one entity by reference. `includes` is accepted for
    /// forward compatibility with a relationship-include resolver but
    /// unused here — expanding `includes` is an external collaborator's
    /// job, same as the query compiler behind [`Self::search`].
    pub fn fetch_entity(&self, ns: Namespace, reference: &EntityRef) -> Result<Entity, Error> {
        Ok(self.store.fetch_entity(ns, reference)?)
    }

    /// Run a structurally-valid query (spec.md §4.2) against one
    /// namespace, delegating to the injected [`QueryExecutor`].
    pub fn search(&self, ns: Namespace, query: &Value) -> Result<SearchResult, Error> {
        ledgergraph_core::validate::query_params::validate_query_params(query)
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        self.query_executor.execute(self.store.as_ref(), ns, query)
    }

    /// The current resolved record schema (fields + types folded from
    /// `config` rows).
    pub fn get_node_schema(&self) -> Result<NodeSchema, Error> {
        self.schema_cache.get_or_rebuild(self.store.as_ref())
    }

    /// The fixed schema describing the `config` namespace's own
    /// `Field`/`Type` reserved types.
    pub fn get_config_schema(&self) -> NodeSchema {
        self.config_schema.clone()
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").field("version", &self.version()).finish()
    }
}
