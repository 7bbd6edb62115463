//! Optional hooks around `update` (spec.md §4.4). Grounded on the
//! teacher's habit of pairing a trait with a harmless default impl (e.g.
//! `security::Null`) so embedding clients opt in selectively.

use crate::error::Error;

use super::Transaction;

/// Hooks invoked around a single `update`. All methods have no-op
/// defaults; implement only the ones a client needs.
pub trait TransactionCallbacks: Send + Sync {
    /// Called before the storage transaction opens. The returned closure,
    /// if any, is invoked if the storage transaction later errors —
    /// mirrors external bookkeeping that needs its own compensating
    /// action (spec.md §4.4).
    fn before_transaction(&self, _tx: &Transaction) -> Option<Box<dyn FnOnce() + Send>> {
        None
    }

    /// Called inside the storage transaction, after changesets are
    /// applied but before commit. Returning an error rolls the
    /// transaction back.
    fn before_commit(&self, _tx: &Transaction) -> Result<(), Error> {
        Ok(())
    }

    /// Fire-and-forget, after a successful commit.
    fn after_commit(&self, _tx: &Transaction) {}

    /// After a successful rollback; `reverted` is newest-first.
    fn after_rollback(&self, _reverted: &[Transaction], _count: u64) {}
}

/// The default, no-op set of callbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallbacks;

impl TransactionCallbacks for NoopCallbacks {}
