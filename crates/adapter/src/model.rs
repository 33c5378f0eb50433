use serde::{Deserialize, Serialize};

/// Column types the adapter knows how to create and bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Boolean,
    BigInt,
    Double,
    Decimal,
    Text,
    Uuid,
    Timestamp,
    Json,
}

impl ColumnType {
    /// Returns the Postgres type name for this column type.
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Decimal => "NUMERIC",
            ColumnType::Text => "TEXT",
            ColumnType::Uuid => "UUID",
            ColumnType::Timestamp => "TIMESTAMPTZ",
            ColumnType::Json => "JSONB",
        }
    }
}

/// A single column in a model definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Describes the table an adapter instance is bound to.
///
/// The adapter never interprets entity fields beyond what filters reference
/// by name; the model only supplies the table binding, the id column and the
/// column set used by `sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDef {
    pub table: String,
    pub id_column: String,
    pub columns: Vec<ColumnDef>,
}

impl ModelDef {
    /// A model bound to `table` with the conventional `id` UUID column.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id_column: "id".to_string(),
            columns: vec![ColumnDef::new("id", ColumnType::Uuid)],
        }
    }

    pub fn id_column(mut self, name: impl Into<String>) -> Self {
        self.id_column = name.into();
        self
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }
}

/// The service descriptor handed to the adapter by the host framework.
///
/// A service that opts into storage must carry a model definition; `init`
/// rejects a schema without one before any connection is attempted.
#[derive(Debug, Clone, Default)]
pub struct ServiceSchema {
    pub name: String,
    pub model: Option<ModelDef>,
}

impl ServiceSchema {
    pub fn new(name: impl Into<String>, model: ModelDef) -> Self {
        Self {
            name: name.into(),
            model: Some(model),
        }
    }
}
