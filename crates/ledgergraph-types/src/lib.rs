//! Shared value types used across the ledgergraph workspace.

pub mod value;

pub use value::{canonical_bytes, canonical_eq, is_nullish};

/// Field/changeset value type. A thin re-export so downstream crates don't
/// need a direct `serde_json` dependency just to name the type.
pub type Value = serde_json::Value;
