//! The entity store seam and its in-memory reference implementation
//! (spec.md §6).

pub mod memory;
pub mod traits;

pub use memory::MemoryEntityStore;
pub use traits::{EntityStore, StoreError, StoredTransaction};
