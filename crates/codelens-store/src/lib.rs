//! Relational persistence and navigation queries for the code index.
//!
//! Durable writes (`schema`, `store`) and read-only navigation
//! (`query`) are split into separate modules the way `arbor-graph` split
//! `store.rs` from `graph.rs`, except here the relational engine itself
//! is the index — there's no separate in-memory structure to keep in
//! sync.

mod error;
mod row;
mod schema;
mod store;

pub mod query;

pub use error::{Result, StoreError};
pub use query::{CallGraph, CallerRef, ReferenceFilter, Stats, SymbolFilter};
pub use store::{ReplaceSummary, Store};
