//! The changeset algebra: change operators, per-entity changesets, and
//! transaction hashing (spec.md §3-§5).

pub mod change_op;
pub mod changeset;
pub mod hash;

pub use change_op::{set_effective_value, ChangeOp, ListMutation};
pub use changeset::{apply_changeset, inverse_changeset, EntitiesChangeset, FieldChangeset};
pub use hash::{transaction_hash, GENESIS_HASH};
