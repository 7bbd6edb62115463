//! Canonical JSON value used for entity fields, changesets and transaction
//! hashing.
//!
//! Field values, `fields: JSON` in the spec's data model, are represented
//! directly as [`serde_json::Value`]. This crate is built without the
//! `preserve_order` feature on `serde_json`, so `serde_json::Map` is backed
//! by a `BTreeMap` and object keys are always emitted in sorted order —
//! that alone satisfies the "stable key ordering" half of the canonical
//! hashing invariant. The other half, fixed number formatting and no
//! incidental whitespace, falls out of `serde_json::to_vec`, which never
//! pretty-prints.

use serde_json::Value;

/// Encode a value into its canonical byte representation.
///
/// Two values that are `==` under [`serde_json::Value`]'s `PartialEq`
/// produce identical bytes, and the bytes are stable across processes and
/// platforms (no map iteration order, no locale-dependent number
/// formatting).
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    // serde_json::to_vec never pretty-prints and Map iterates in BTreeMap
    // (sorted) order without the `preserve_order` feature.
    serde_json::to_vec(value).expect("Value always serializes")
}

/// True if two values are canonically equal (used when checking that an
/// update's declared `previous` matches the value actually stored).
pub fn canonical_eq(a: &Value, b: &Value) -> bool {
    canonical_bytes(a) == canonical_bytes(b)
}

/// True if the value represents "no value" at the field-storage layer:
/// either JSON `null` or a fully absent key are treated as the same thing
/// once a `ChangeOp::Set` is folded into a fieldset.
pub fn is_nullish(value: &Value) -> bool {
    value.is_null()
}
