//! The transaction processor (spec.md §4.4): composes config and record
//! changesets into one hash-chained transaction, applies it, and inverts
//! prior transactions on rollback.

pub mod callbacks;

pub use callbacks::{NoopCallbacks, TransactionCallbacks};

use tracing::{instrument, warn};

use crate::algebra::{
    apply_changeset, inverse_changeset, transaction_hash, ChangeOp, EntitiesChangeset,
    FieldChangeset,
};
use crate::changeset_processor::{apply_config_changeset_to_schema, process_changesets, EntityChangesetInput};
use crate::error::Error;
use crate::model::{identifiers::Uid, EntityRef, Fieldset, Namespace, NodeSchema};
use crate::store::{EntityStore, StoredTransaction};

/// One caller-submitted batch: config edits, record edits, and the
/// author attributed to both (spec.md §4.4).
#[derive(Debug, Clone, Default)]
pub struct TransactionInput {
    pub author: String,
    pub configs: Vec<EntityChangesetInput>,
    pub records: Vec<EntityChangesetInput>,
}

/// A fully assembled, hash-chained transaction (spec.md §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: u64,
    pub previous: String,
    pub hash: String,
    pub configs: EntitiesChangeset,
    pub records: EntitiesChangeset,
    pub author: String,
    pub created_at: String,
}

impl Transaction {
    fn to_stored(&self) -> StoredTransaction {
        StoredTransaction {
            id: self.id,
            hash: self.hash.clone(),
            previous: self.previous.clone(),
            configs: self.configs.clone(),
            records: self.records.clone(),
            author: self.author.clone(),
            created_at: self.created_at.clone(),
        }
    }

    fn from_stored(stored: StoredTransaction) -> Self {
        Self {
            id: stored.id,
            previous: stored.previous,
            hash: stored.hash,
            configs: stored.configs,
            records: stored.records,
            author: stored.author,
            created_at: stored.created_at,
        }
    }

    /// The inverse transaction: every changeset inverted, chained the
    /// other way (used only in-memory during rollback, never hashed or
    /// stored itself).
    fn invert(&self) -> Result<Transaction, Error> {
        Ok(Transaction {
            id: self.id,
            previous: self.previous.clone(),
            hash: self.hash.clone(),
            configs: invert_entities_changeset(&self.configs)?,
            records: invert_entities_changeset(&self.records)?,
            author: self.author.clone(),
            created_at: self.created_at.clone(),
        })
    }
}

fn invert_entities_changeset(changeset: &EntitiesChangeset) -> Result<EntitiesChangeset, Error> {
    changeset
        .iter()
        .map(|(uid, fc)| Ok((uid.clone(), inverse_changeset(fc)?)))
        .collect()
}

/// `processTransactionInput` (spec.md §4.4 steps 1-6).
#[instrument(skip(store, node_schema, config_schema, input), fields(author = %input.author))]
pub fn process_transaction_input(
    store: &dyn EntityStore,
    node_schema: &NodeSchema,
    config_schema: &NodeSchema,
    input: &TransactionInput,
    created_at: &str,
    genesis_hash: &str,
) -> Result<Transaction, Error> {
    let tip = store.get_version();
    let previous = if tip.is_genesis() {
        genesis_hash.to_string()
    } else {
        tip.hash
    };

    let configs = process_changesets(store, Namespace::Config, config_schema, &input.configs)?;
    let folded_schema = apply_config_changeset_to_schema(node_schema, &configs)?;
    let records = process_changesets(store, Namespace::Record, &folded_schema, &input.records)?;

    let hash = transaction_hash(&previous, &input.author, created_at, &configs, &records)?;

    Ok(Transaction {
        id: tip.id + 1,
        previous,
        hash,
        configs,
        records,
        author: input.author.clone(),
        created_at: created_at.to_string(),
    })
}

/// Whether `apply_single` is laying down a transaction's own changes, or
/// undoing a prior one during rollback. Rollback must not record the
/// undone transaction's id into `txIds` the way a forward apply does —
/// see [`apply_single`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApplyMode {
    Forward,
    Reverse,
}

/// `applyTransaction` (spec.md §4.4): config changesets first, then
/// record changesets; every non-deleting changeset gets `txIds` appended.
pub fn apply_transaction(store: &dyn EntityStore, transaction: &Transaction) -> Result<(), Error> {
    apply_transaction_as(store, transaction, ApplyMode::Forward)
}

fn apply_transaction_as(store: &dyn EntityStore, transaction: &Transaction, mode: ApplyMode) -> Result<(), Error> {
    for (uid, changeset) in &transaction.configs {
        apply_single(store, Namespace::Config, uid, changeset, transaction.id, mode)?;
    }
    for (uid, changeset) in &transaction.records {
        apply_single(store, Namespace::Record, uid, changeset, transaction.id, mode)?;
    }
    Ok(())
}

/// `applyAndSaveTransaction`: apply, then append the transaction row.
pub fn apply_and_save_transaction(
    store: &dyn EntityStore,
    callbacks: &dyn TransactionCallbacks,
    transaction: Transaction,
) -> Result<Transaction, Error> {
    apply_transaction(store, &transaction)?;
    callbacks.before_commit(&transaction)?;
    store.save_transaction(transaction.to_stored())?;
    callbacks.after_commit(&transaction);
    Ok(transaction)
}

/// Apply one entity's changeset. `tx_id` is the id of the transaction
/// *producing* the effect: the transaction being applied in
/// [`ApplyMode::Forward`], or the transaction being undone in
/// [`ApplyMode::Reverse`] (rollback runs the inverted changeset, but the
/// id carried on it is still the original transaction's, per
/// `Transaction::invert`).
///
/// `txIds` bookkeeping depends on that distinction: a forward update
/// appends `tx_id` to provenance; a reverse update must instead remove
/// it, or rollback leaves `tx_id` in `txIds` twice — once for real, once
/// from undoing it — even though the transaction's log row is deleted
/// right after (spec.md §3 invariant 6, §8 "rollback restores byte-equal
/// state").
fn apply_single(
    store: &dyn EntityStore,
    ns: Namespace,
    uid: &str,
    changeset: &FieldChangeset,
    tx_id: u64,
    mode: ApplyMode,
) -> Result<(), Error> {
    let reference = Uid::parse(uid)
        .map(EntityRef::Uid)
        .ok_or_else(|| Error::InvalidInput(format!("'{uid}' is not a valid uid")))?;

    let id_op = changeset.get("id");
    let is_delete = matches!(id_op, Some(ChangeOp::Set { value, previous }) if value.is_null() && !previous.is_null());
    let is_create = matches!(id_op, Some(ChangeOp::Set { value, previous }) if !value.is_null() && previous.is_null());

    if is_delete {
        store.delete_entity(ns, &reference)?;
        return Ok(());
    }

    if is_create {
        let mut fieldset = Fieldset::new();
        apply_changeset(&mut fieldset, changeset)?;
        let tx_ids = match mode {
            ApplyMode::Forward => vec![tx_id],
            // Reached only when rolling back a delete and recreating the
            // entity; the delete's changeset carries no prior `txIds` to
            // restore, so provenance restarts clean rather than
            // fabricating history.
            ApplyMode::Reverse => Vec::new(),
        };
        fieldset.insert("txIds".into(), serde_json::json!(tx_ids));
        store.create_entity(ns, fieldset)?;
        return Ok(());
    }

    let current = store.fetch_entity(ns, &reference)?;
    let mut patch = Fieldset::new();
    apply_changeset(&mut patch, changeset)?;
    let mut tx_ids = current.tx_ids.clone();
    match mode {
        ApplyMode::Forward => tx_ids.push(tx_id),
        ApplyMode::Reverse => tx_ids.retain(|&id| id != tx_id),
    }
    patch.insert("txIds".into(), serde_json::json!(tx_ids));
    store.update_entity(ns, &reference, &patch)?;
    Ok(())
}

/// `rollbackTransaction` (spec.md §4.4): invert and re-apply the last
/// `count` transactions, newest first, then delete their log rows.
/// Returns the reverted transactions in the same (newest-first) order.
#[instrument(skip(store, callbacks))]
pub fn rollback_transaction(
    store: &dyn EntityStore,
    callbacks: &dyn TransactionCallbacks,
    count: u64,
    expected_version: u64,
) -> Result<Vec<Transaction>, Error> {
    if count < 1 {
        return Err(Error::InvalidRollback("count must be at least 1".into()));
    }

    let tip = store.get_version();
    if tip.id != expected_version {
        return Err(Error::VersionMismatch {
            expected: expected_version,
            actual: tip.id,
        });
    }
    if count > tip.id {
        return Err(Error::InvalidRollback(format!(
            "cannot roll back {count} transactions with only {} in the log",
            tip.id
        )));
    }

    if count > 1 {
        warn!(count, "rolling back more than one transaction");
    }

    let mut reverted = Vec::with_capacity(count as usize);
    for id in (tip.id - count + 1..=tip.id).rev() {
        let stored = store.fetch_transaction(&EntityRef::Id(crate::model::EntityId(id)))?;
        let transaction = Transaction::from_stored(stored);
        let inverse = transaction.invert()?;

        apply_transaction_as(store, &inverse, ApplyMode::Reverse)?;
        reverted.push(transaction);
    }

    store.delete_transactions_above(tip.id - count);
    callbacks.after_rollback(&reverted, count);

    Ok(reverted)
}
