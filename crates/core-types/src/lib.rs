//! # Trestle Core Types
//!
//! This crate defines the database-agnostic vocabulary shared by the adapter
//! and its callers: scalar values, predicate trees, sort specifications and
//! the generic filter object.
//!
//! As a Layer 0 crate it has no knowledge of any concrete storage engine;
//! everything here is plain data plus pure normalization logic.

// Declare the modules that make up this crate.
pub mod filter;
pub mod predicate;
pub mod sort;
pub mod value;

// Re-export the core types to provide a clean public API.
pub use filter::{FilterParams, SearchFields};
pub use predicate::{CmpOp, Predicate};
pub use sort::{normalize_sort, SortDirection, SortSpec};
pub use value::Value;
