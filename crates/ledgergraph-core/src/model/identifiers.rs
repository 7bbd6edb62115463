//! Identifier shapes shared by every editable entity: `id`, `uid`, `key`.
//!
//! Grounded on `ormdb-core::storage::key::VersionedKey`'s fixed-width
//! encode/decode style, adapted to the spec's three identifier shapes
//! instead of a single versioned storage key.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Monotonically increasing, never-reused, per-namespace entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    pub fn next(self) -> Self {
        EntityId(self.0 + 1)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const UID_LEN: usize = 10;
const UID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Opaque, globally-unique-within-namespace, fixed-format identifier.
///
/// Format: 10 alphanumeric characters. Immutable once assigned (invariant
/// 1 in the spec's data model).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uid(String);

impl Uid {
    /// Generate a fresh random uid. Callers are responsible for retrying
    /// on the (astronomically unlikely) event of a namespace collision —
    /// the store adapter is the source of truth for uniqueness.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let s: String = (0..UID_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..UID_ALPHABET.len());
                UID_ALPHABET[idx] as char
            })
            .collect();
        Uid(s)
    }

    /// Parse a uid, validating the fixed 10-char alphanumeric format.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() == UID_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Some(Uid(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uid> for String {
    fn from(u: Uid) -> Self {
        u.0
    }
}

/// The three namespaces the spec defines. Only `Record` and `Config` are
/// editable by user input; `Transaction` is append-only.
///
/// Operations generic over namespace (§4.3's "polymorphism over
/// namespace") dispatch on this enum rather than via per-type inheritance,
/// per spec.md §9's design note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    Record,
    Config,
    Transaction,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Record => "record",
            Namespace::Config => "config",
            Namespace::Transaction => "transaction",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Any of the three identifier shapes, as accepted in a `$ref` or in an
/// input's identity fields. The store resolves this to a `uid` before any
/// mutation is applied (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Id(EntityId),
    Uid(Uid),
    Key(String),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Id(id) => write!(f, "{id}"),
            EntityRef::Uid(uid) => write!(f, "{uid}"),
            EntityRef::Key(key) => write!(f, "{key}"),
        }
    }
}
