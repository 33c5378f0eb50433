//! # Trestle Adapter Crate
//!
//! This crate is the storage adapter proper: a uniform, collection-oriented
//! CRUD surface over PostgreSQL for service frameworks that treat storage
//! as a pluggable dependency.
//!
//! ## Architectural Principles
//!
//! - **Translation layer:** generic filter objects (`core-types`) are turned
//!   into native query descriptors here; all SQL knowledge lives behind the
//!   [`StorageEngine`] seam.
//! - **One connection per process:** adapters that opt into shared mode
//!   reuse a single connection handle through an explicitly injected
//!   [`ConnectionRegistry`]; there is no global state.
//! - **No local recovery:** every storage failure propagates unchanged to
//!   the caller; this layer performs no retries.
//!
//! ## Public API
//!
//! - `SqlAdapter`: the adapter facade with the full CRUD surface.
//! - `ConnectionRegistry`: process-wide connection sharing, injected by the
//!   host application.
//! - `StorageEngine` / `PgEngine`: the native operation seam and its
//!   Postgres implementation.
//! - `QueryPlan`: the native query descriptor built from filter objects.
//! - `AdapterError`: the specific error types returned from this crate.

// Declare the modules that constitute this crate.
pub mod adapter;
pub mod connection;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod model;
pub mod postgres;

// Re-export the key components to create a clean, public-facing API.
pub use adapter::SqlAdapter;
pub use connection::ConnectionRegistry;
pub use cursor::QueryPlan;
pub use engine::{Entity, QueryKind, RawOptions, RawOutcome, Record, StorageEngine};
pub use error::AdapterError;
pub use model::{ColumnDef, ColumnType, ModelDef, ServiceSchema};
pub use postgres::PgEngine;
