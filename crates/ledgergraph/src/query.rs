//! The `search` seam (SPEC_FULL.md §6): spec.md scopes the query
//! compiler itself out ("filters/sort/pagination over a single
//! namespace" is named but left to an external collaborator), so `Db`
//! delegates to an injected [`QueryExecutor`] rather than compiling
//! queries itself — the same shape as [`ledgergraph_core::EntityStore`]
//! standing in for the real row store.
//!
//! [`FilterQueryExecutor`] is the reference implementation this crate
//! ships so it's runnable standalone: exact-match equality over
//! `filters` (a `type` filter is mandatory, since it's the only index
//! [`EntityStore::list_by_type`] offers) plus a `pagination.limit` cap.
//! Sort and cursor pagination are left to a real query compiler.

use ledgergraph_core::{Entity, EntityStore, Error, Namespace};
use ledgergraph_types::{canonical_eq, Value};

/// The result of a [`QueryExecutor::execute`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub items: Vec<Entity>,
}

/// Executes a structurally-validated query (spec.md §4.2's `query`
/// dataType) against one namespace. Implementations may use whatever
/// indexing the backing store provides; `Db` only ever calls this after
/// [`ledgergraph_core::validate::query_params::validate_query_params`]
/// has already accepted the shape.
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, store: &dyn EntityStore, ns: Namespace, query: &Value) -> Result<SearchResult, Error>;
}

/// Reference [`QueryExecutor`]: equality filters over [`EntityStore::list_by_type`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterQueryExecutor;

impl QueryExecutor for FilterQueryExecutor {
    fn execute(&self, store: &dyn EntityStore, ns: Namespace, query: &Value) -> Result<SearchResult, Error> {
        let obj = query
            .as_object()
            .ok_or_else(|| Error::InvalidInput("query value must be an object".into()))?;

        let filters = obj
            .get("filters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let type_filter = filters
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidInput("search requires a 'type' filter".into()))?;

        let mut items = store.list_by_type(ns, type_filter);

        for (key, expected) in filters.iter() {
            if key == "type" {
                continue;
            }
            items.retain(|entity| {
                entity
                    .get(key)
                    .map(|actual| canonical_eq(actual, expected))
                    .unwrap_or(false)
            });
        }

        if let Some(limit) = obj
            .get("pagination")
            .and_then(Value::as_object)
            .and_then(|p| p.get("limit"))
            .and_then(Value::as_u64)
        {
            items.truncate(limit as usize);
        }

        Ok(SearchResult { items })
    }
}
