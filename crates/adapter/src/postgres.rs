use crate::cursor::QueryPlan;
use crate::engine::{Entity, QueryKind, RawOptions, RawOutcome, Record, StorageEngine};
use crate::error::AdapterError;
use crate::model::ModelDef;
use async_trait::async_trait;
use configuration::StorageSettings;
use core_types::{Predicate, Value};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, QueryBuilder, Row, TypeInfo};
use std::time::Duration;
use tracing::{debug, info};

/// The production storage engine: PostgreSQL through a `sqlx` pool.
///
/// Renders query plans into SQL with [`sqlx::QueryBuilder`] and projects
/// rows back into plain records keyed by column name.
#[derive(Debug, Clone)]
pub struct PgEngine {
    pool: PgPool,
}

impl PgEngine {
    /// Opens a connection pool against the configured database.
    ///
    /// The facade performs the [`StorageEngine::authenticate`] round-trip
    /// right after construction; a failure on either step fails the whole
    /// connect with no retry.
    pub async fn connect(settings: &StorageSettings) -> Result<Self, AdapterError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .connect(&settings.database_url)
            .await
            .map_err(|e| AdapterError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Direct access to the underlying pool, for callers that need to step
    /// outside the adapter surface.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn push_value(builder: &mut QueryBuilder<'static, Postgres>, value: &Value) {
    match value {
        Value::Null => {
            builder.push("NULL");
        }
        Value::Bool(v) => {
            builder.push_bind(*v);
        }
        Value::Int(v) => {
            builder.push_bind(*v);
        }
        Value::Float(v) => {
            builder.push_bind(*v);
        }
        Value::Decimal(v) => {
            builder.push_bind(*v);
        }
        Value::Text(v) => {
            builder.push_bind(v.clone());
        }
        Value::Uuid(v) => {
            builder.push_bind(*v);
        }
        Value::Timestamp(v) => {
            builder.push_bind(*v);
        }
        Value::Json(v) => {
            builder.push_bind(v.clone());
        }
    }
}

/// Renders a predicate tree into the builder.
///
/// `All` and an empty conjunction render as `TRUE`; an empty disjunction
/// renders as `FALSE` (a disjunction over zero clauses matches nothing).
fn push_predicate(builder: &mut QueryBuilder<'static, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::All => {
            builder.push("TRUE");
        }
        Predicate::Cmp(field, op, value) => {
            builder.push(quote_ident(field));
            builder.push(format!(" {} ", op.as_sql()));
            push_value(builder, value);
        }
        Predicate::Like(field, needle) => {
            builder.push(quote_ident(field));
            builder.push(" LIKE ");
            builder.push_bind(format!("%{needle}%"));
        }
        Predicate::In(field, values) => {
            if values.is_empty() {
                builder.push("FALSE");
                return;
            }
            builder.push(quote_ident(field));
            builder.push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                push_value(builder, value);
            }
            builder.push(")");
        }
        Predicate::And(clauses) => push_clauses(builder, clauses, " AND ", "TRUE"),
        Predicate::Or(clauses) => push_clauses(builder, clauses, " OR ", "FALSE"),
    }
}

fn push_clauses(
    builder: &mut QueryBuilder<'static, Postgres>,
    clauses: &[Predicate],
    joiner: &str,
    vacuous: &str,
) {
    if clauses.is_empty() {
        builder.push(vacuous);
        return;
    }
    builder.push("(");
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            builder.push(joiner);
        }
        push_predicate(builder, clause);
    }
    builder.push(")");
}

/// Builds the `SELECT *` statement for a query plan.
fn select_builder(model: &ModelDef, plan: &QueryPlan) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT * FROM ");
    builder.push(quote_ident(&model.table));
    builder.push(" WHERE ");
    push_predicate(&mut builder, &plan.predicate);

    if !plan.order.is_empty() {
        builder.push(" ORDER BY ");
        for (i, (field, direction)) in plan.order.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(quote_ident(field));
            builder.push(" ");
            builder.push(direction.as_sql());
        }
    }

    if let Some(limit) = plan.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }
    if let Some(offset) = plan.offset {
        builder.push(" OFFSET ");
        builder.push_bind(offset);
    }
    builder
}

/// Builds the `COUNT(*)` statement for a query plan. Ordering and
/// pagination have no effect on a count and are left out.
fn count_builder(model: &ModelDef, plan: &QueryPlan) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM ");
    builder.push(quote_ident(&model.table));
    builder.push(" WHERE ");
    push_predicate(&mut builder, &plan.predicate);
    builder
}

/// Renders the table definition `sync` executes.
fn create_table_sql(model: &ModelDef) -> String {
    let columns = model
        .columns
        .iter()
        .map(|column| {
            let mut sql = format!("{} {}", quote_ident(&column.name), column.ty.as_sql());
            if !column.nullable {
                sql.push_str(" NOT NULL");
            }
            if column.name == model.id_column {
                sql.push_str(" PRIMARY KEY");
            }
            sql
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({columns})",
        quote_ident(&model.table)
    )
}

/// Projects a row into a plain record, keyed by column name.
fn record_from_row(row: &PgRow) -> Result<Record, AdapterError> {
    let mut record = Record::new();
    for column in row.columns() {
        let name = column.name();
        let value = match column.type_info().name() {
            "BOOL" => row.try_get::<Option<bool>, _>(name)?.into(),
            "INT2" => Value::from(row.try_get::<Option<i16>, _>(name)?.map(i64::from)),
            "INT4" => Value::from(row.try_get::<Option<i32>, _>(name)?.map(i64::from)),
            "INT8" => row.try_get::<Option<i64>, _>(name)?.into(),
            "FLOAT4" => Value::from(row.try_get::<Option<f32>, _>(name)?.map(f64::from)),
            "FLOAT8" => row.try_get::<Option<f64>, _>(name)?.into(),
            "NUMERIC" => row
                .try_get::<Option<rust_decimal::Decimal>, _>(name)?
                .into(),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                row.try_get::<Option<String>, _>(name)?.into()
            }
            "UUID" => row.try_get::<Option<uuid::Uuid>, _>(name)?.into(),
            "TIMESTAMPTZ" => row
                .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name)?
                .into(),
            "JSON" | "JSONB" => row.try_get::<Option<serde_json::Value>, _>(name)?.into(),
            other => return Err(AdapterError::UnsupportedValue(other.to_string())),
        };
        record.insert(name.to_string(), value);
    }
    Ok(record)
}

fn bind_raw<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Decimal(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Uuid(v) => query.bind(*v),
        Value::Timestamp(v) => query.bind(*v),
        Value::Json(v) => query.bind(v.clone()),
    }
}

#[async_trait]
impl StorageEngine for PgEngine {
    async fn authenticate(&self) -> Result<(), AdapterError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AdapterError::Connection(e.to_string()))?;
        info!("authenticated against the database");
        Ok(())
    }

    async fn sync(&self, model: &ModelDef) -> Result<(), AdapterError> {
        let sql = create_table_sql(model);
        debug!(sql = %sql, "sync");
        sqlx::query(&sql).execute(&self.pool).await?;
        info!(table = %model.table, "model table synchronized");
        Ok(())
    }

    async fn create(&self, model: &ModelDef, record: &Record) -> Result<Entity, AdapterError> {
        let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new("INSERT INTO ");
        builder.push(quote_ident(&model.table));

        if record.is_empty() {
            builder.push(" DEFAULT VALUES");
        } else {
            builder.push(" (");
            for (i, name) in record.keys().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                builder.push(quote_ident(name));
            }
            builder.push(") VALUES (");
            for (i, value) in record.values().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                push_value(&mut builder, value);
            }
            builder.push(")");
        }
        builder.push(" RETURNING *");

        debug!(sql = builder.sql(), "create");
        let row = builder.build().fetch_one(&self.pool).await?;
        Ok(Entity::new(model.table.clone(), record_from_row(&row)?))
    }

    async fn find_all(
        &self,
        model: &ModelDef,
        plan: &QueryPlan,
    ) -> Result<Vec<Entity>, AdapterError> {
        let mut builder = select_builder(model, plan);
        debug!(sql = builder.sql(), "find_all");
        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Ok(Entity::new(model.table.clone(), record_from_row(row)?)))
            .collect()
    }

    async fn find_one(
        &self,
        model: &ModelDef,
        predicate: &Predicate,
    ) -> Result<Option<Entity>, AdapterError> {
        let plan = QueryPlan {
            predicate: predicate.clone(),
            limit: Some(1),
            ..Default::default()
        };
        let mut builder = select_builder(model, &plan);
        let row = builder.build().fetch_optional(&self.pool).await?;
        row.map(|row| Ok(Entity::new(model.table.clone(), record_from_row(&row)?)))
            .transpose()
    }

    async fn find_by_id(
        &self,
        model: &ModelDef,
        id: &Value,
    ) -> Result<Option<Entity>, AdapterError> {
        let predicate = Predicate::Cmp(
            model.id_column.clone(),
            core_types::CmpOp::Eq,
            id.clone(),
        );
        self.find_one(model, &predicate).await
    }

    async fn count(&self, model: &ModelDef, plan: &QueryPlan) -> Result<u64, AdapterError> {
        let mut builder = count_builder(model, plan);
        debug!(sql = builder.sql(), "count");
        let row = builder.build().fetch_one(&self.pool).await?;
        let count: i64 = row.try_get(0)?;
        Ok(count as u64)
    }

    async fn update(
        &self,
        model: &ModelDef,
        predicate: &Predicate,
        patch: &Record,
    ) -> Result<u64, AdapterError> {
        // An empty patch has nothing to write; zero rows are affected.
        if patch.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new("UPDATE ");
        builder.push(quote_ident(&model.table));
        builder.push(" SET ");
        for (i, (name, value)) in patch.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(quote_ident(name));
            builder.push(" = ");
            push_value(&mut builder, value);
        }
        builder.push(" WHERE ");
        push_predicate(&mut builder, predicate);

        debug!(sql = builder.sql(), "update");
        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn destroy(&self, model: &ModelDef, predicate: &Predicate) -> Result<u64, AdapterError> {
        let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new("DELETE FROM ");
        builder.push(quote_ident(&model.table));
        builder.push(" WHERE ");
        push_predicate(&mut builder, predicate);

        debug!(sql = builder.sql(), "destroy");
        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn raw_query(
        &self,
        statement: &str,
        options: &RawOptions,
        kind: QueryKind,
    ) -> Result<RawOutcome, AdapterError> {
        debug!(sql = statement, ?kind, "raw query");
        let mut query = sqlx::query(statement);
        for value in &options.bind {
            query = bind_raw(query, value);
        }

        match kind {
            QueryKind::Select => {
                let rows = query.fetch_all(&self.pool).await?;
                let records = rows
                    .iter()
                    .map(record_from_row)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RawOutcome::Rows(records))
            }
            QueryKind::Insert | QueryKind::Update | QueryKind::Delete => {
                let result = query.execute(&self.pool).await?;
                Ok(RawOutcome::Affected(result.rows_affected()))
            }
        }
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.pool.close().await;
        info!("connection pool closed");
        Ok(())
    }
}
