//! # Trestle
//!
//! A collection-oriented SQL storage adapter for service frameworks that
//! treat storage as a pluggable dependency. Trestle translates generic
//! filter objects into native Postgres queries and shares one connection
//! handle per process between the adapter instances that opt in.
//!
//! The heavy lifting lives in the member crates; this package re-exports
//! their public surface under one roof.

pub use adapter::{
    AdapterError, ColumnDef, ColumnType, ConnectionRegistry, Entity, ModelDef, PgEngine,
    QueryKind, QueryPlan, RawOptions, RawOutcome, Record, ServiceSchema, SqlAdapter,
    StorageEngine,
};
pub use configuration::{load_settings, ConfigError, StorageSettings};
pub use core_types::{
    normalize_sort, CmpOp, FilterParams, Predicate, SearchFields, SortDirection, SortSpec, Value,
};
