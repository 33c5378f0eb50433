use crate::cursor::QueryPlan;
use crate::error::AdapterError;
use crate::model::ModelDef;
use async_trait::async_trait;
use core_types::{Predicate, Value};
use std::collections::BTreeMap;

/// A plain field-keyed projection of an entity, free of engine metadata.
pub type Record = BTreeMap<String, Value>;

/// An entity instance returned by the storage engine.
///
/// Carries the projected fields plus engine-internal bookkeeping (currently
/// the source table). Callers that need a plain structure go through
/// [`Entity::into_object`], which strips the metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    table: String,
    fields: Record,
}

impl Entity {
    pub fn new(table: impl Into<String>, fields: Record) -> Self {
        Self {
            table: table.into(),
            fields,
        }
    }

    /// The table this entity was fetched from.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Projects the entity to a plain field-keyed record, discarding all
    /// engine-internal metadata.
    pub fn into_object(self) -> Record {
        self.fields
    }
}

/// Which native operation a raw statement maps to.
///
/// Selects return projected rows; every other kind reports the number of
/// affected rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryKind {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryKind {
    /// Case-insensitive lookup, mirroring the loose string selector of
    /// service frameworks (`"select"`, `"UPDATE"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SELECT" => Some(QueryKind::Select),
            "INSERT" => Some(QueryKind::Insert),
            "UPDATE" => Some(QueryKind::Update),
            "DELETE" => Some(QueryKind::Delete),
            _ => None,
        }
    }
}

/// Options forwarded with a raw statement.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    /// Positional bind values, referenced as `$1`, `$2`, ... in the statement.
    pub bind: Vec<Value>,
}

/// Result of a raw statement.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    Rows(Vec<Record>),
    Affected(u64),
}

/// The native operation surface of a storage engine.
///
/// The adapter facade speaks only this trait; the production implementation
/// is [`crate::postgres::PgEngine`], and tests substitute an in-memory
/// double. Every failure propagates unchanged to the caller; the adapter
/// layer performs no retries and no local recovery.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Handshake round-trip; must resolve before any query is issued.
    async fn authenticate(&self) -> Result<(), AdapterError>;

    /// Ensures the model's table exists.
    async fn sync(&self, model: &ModelDef) -> Result<(), AdapterError>;

    async fn create(&self, model: &ModelDef, record: &Record) -> Result<Entity, AdapterError>;

    async fn find_all(&self, model: &ModelDef, plan: &QueryPlan)
        -> Result<Vec<Entity>, AdapterError>;

    async fn find_one(
        &self,
        model: &ModelDef,
        predicate: &Predicate,
    ) -> Result<Option<Entity>, AdapterError>;

    async fn find_by_id(&self, model: &ModelDef, id: &Value)
        -> Result<Option<Entity>, AdapterError>;

    async fn count(&self, model: &ModelDef, plan: &QueryPlan) -> Result<u64, AdapterError>;

    /// Applies `patch` to every entity matching `predicate`; returns the
    /// number of affected rows.
    async fn update(
        &self,
        model: &ModelDef,
        predicate: &Predicate,
        patch: &Record,
    ) -> Result<u64, AdapterError>;

    /// Deletes every entity matching `predicate`; returns the number of
    /// affected rows.
    async fn destroy(&self, model: &ModelDef, predicate: &Predicate) -> Result<u64, AdapterError>;

    async fn raw_query(
        &self,
        statement: &str,
        options: &RawOptions,
        kind: QueryKind,
    ) -> Result<RawOutcome, AdapterError>;

    /// Releases the underlying connection.
    async fn close(&self) -> Result<(), AdapterError>;
}
