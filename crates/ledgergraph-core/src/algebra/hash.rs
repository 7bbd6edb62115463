//! Canonical transaction hashing (spec.md §5).
//!
//! Each transaction's hash binds it to its predecessor, forming the
//! tamper-evident chain: `hash = sha256(canonical_json({previous, author,
//! createdAt, configs, records}))`. Grounded on
//! `ormdb-core::replication::changelog`'s use of a monotonically chained
//! log, but the teacher chains on an LSN counter where this chains on a
//! content hash.

use serde::Serialize;
use sha2::{Digest, Sha256};

use ledgergraph_types::Value;

use super::changeset::EntitiesChangeset;

/// Hash of an empty/non-existent transaction log, the `previous` value of
/// the very first transaction.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Serialize)]
struct HashInput<'a> {
    previous: &'a str,
    author: &'a str,
    created_at: &'a str,
    configs: &'a EntitiesChangeset,
    records: &'a EntitiesChangeset,
}

/// Compute a transaction's content hash.
///
/// `created_at` is passed in as an already-formatted RFC 3339 string so
/// that hashing never depends on the local clock or timezone.
pub fn transaction_hash(
    previous: &str,
    author: &str,
    created_at: &str,
    configs: &EntitiesChangeset,
    records: &EntitiesChangeset,
) -> Result<String, crate::error::Error> {
    let input = HashInput {
        previous,
        author,
        created_at,
        configs,
        records,
    };
    let value: Value = serde_json::to_value(&input)
        .map_err(|e| crate::error::Error::Schema(format!("hash input serialization: {e}")))?;
    let bytes = ledgergraph_types::canonical_bytes(&value);

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
