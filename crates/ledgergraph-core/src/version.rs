//! The transaction log's tip pointer (spec.md §6): `{id, hash, updatedAt}`.

use serde::{Deserialize, Serialize};

/// Hash of an empty transaction log, shared with [`crate::algebra::GENESIS_HASH`].
pub use crate::algebra::GENESIS_HASH;

/// Current tip of the transaction chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: u64,
    pub hash: String,
    pub updated_at: String,
}

impl Version {
    /// The synthetic version before any transaction exists (spec.md §6).
    pub fn genesis() -> Self {
        Self {
            id: 0,
            hash: GENESIS_HASH.to_string(),
            updated_at: String::new(),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.id == 0
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::genesis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_has_zero_id_and_genesis_hash() {
        let v = Version::genesis();
        assert!(v.is_genesis());
        assert_eq!(v.hash, GENESIS_HASH);
    }
}
