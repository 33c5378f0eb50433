use crate::connection::ConnectionRegistry;
use crate::cursor::QueryPlan;
use crate::engine::{Entity, QueryKind, RawOptions, RawOutcome, Record, StorageEngine};
use crate::error::AdapterError;
use crate::model::{ModelDef, ServiceSchema};
use crate::postgres::PgEngine;
use configuration::StorageSettings;
use core_types::{CmpOp, FilterParams, Predicate, Value};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{info, warn};

const MISSING_MODEL: &str = "missing `model` definition in the service schema";

/// Where the adapter obtains its storage engine on `connect`.
enum EngineSource {
    /// Open a Postgres pool from connection settings.
    Settings(StorageSettings),
    /// Use a pre-built engine (tests, custom backends).
    Injected(Arc<dyn StorageEngine>),
}

/// The collection-oriented CRUD surface over one model.
///
/// An adapter instance is bound to a single service's model. It translates
/// generic filter objects into native query descriptors and forwards every
/// operation to the storage engine; no failure is retried or recovered
/// here; engine errors propagate unchanged to the caller.
///
/// Instances constructed with [`SqlAdapter::shared`] and the same
/// [`ConnectionRegistry`] reuse one connection handle for the whole
/// process; everything else owns its handle exclusively.
pub struct SqlAdapter {
    source: EngineSource,
    registry: Option<Arc<ConnectionRegistry>>,
    model: Option<ModelDef>,
    engine: Option<Arc<dyn StorageEngine>>,
}

impl SqlAdapter {
    /// An adapter that opens and exclusively owns its own connection.
    pub fn new(settings: StorageSettings) -> Self {
        Self {
            source: EngineSource::Settings(settings),
            registry: None,
            model: None,
            engine: None,
        }
    }

    /// An adapter that shares one connection handle with every other
    /// adapter constructed against the same registry.
    pub fn shared(mut settings: StorageSettings, registry: Arc<ConnectionRegistry>) -> Self {
        settings.shared_connection = true;
        Self {
            source: EngineSource::Settings(settings),
            registry: Some(registry),
            model: None,
            engine: None,
        }
    }

    /// An adapter over a pre-built engine, exclusively owned.
    pub fn with_engine(engine: Arc<dyn StorageEngine>) -> Self {
        Self {
            source: EngineSource::Injected(engine),
            registry: None,
            model: None,
            engine: None,
        }
    }

    /// An adapter over a pre-built engine participating in shared mode.
    pub fn with_shared_engine(
        engine: Arc<dyn StorageEngine>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            source: EngineSource::Injected(engine),
            registry: Some(registry),
            model: None,
            engine: None,
        }
    }

    /// Binds the adapter to the service's model definition.
    ///
    /// Fails synchronously, before any connection attempt, if the schema
    /// carries no model.
    pub fn init(&mut self, schema: &ServiceSchema) -> Result<(), AdapterError> {
        let model = schema
            .model
            .clone()
            .ok_or_else(|| AdapterError::Configuration(MISSING_MODEL.to_string()))?;
        self.model = Some(model);
        Ok(())
    }

    /// Acquires a connection handle, authenticates and syncs the model.
    ///
    /// In shared mode the first connect constructs the handle and stores it
    /// in the registry; later connects reuse it as-is (their own settings
    /// are ignored). The authentication round-trip runs on every connect,
    /// reused handle or not. Any failure propagates; there is no retry.
    pub async fn connect(&mut self) -> Result<(), AdapterError> {
        let model = self
            .model
            .clone()
            .ok_or_else(|| AdapterError::Configuration(MISSING_MODEL.to_string()))?;
        let shared = self.shared_mode();

        let engine: Arc<dyn StorageEngine> = match &self.source {
            EngineSource::Settings(settings) => {
                let settings = settings.clone();
                match (shared, self.registry.as_ref()) {
                    (true, Some(registry)) => {
                        registry
                            .acquire(true, move || async move {
                                let engine = PgEngine::connect(&settings).await?;
                                Ok(Arc::new(engine) as Arc<dyn StorageEngine>)
                            })
                            .await?
                    }
                    _ => Arc::new(PgEngine::connect(&settings).await?),
                }
            }
            EngineSource::Injected(engine) => {
                let engine = Arc::clone(engine);
                match (shared, self.registry.as_ref()) {
                    (true, Some(registry)) => {
                        registry.acquire(true, move || async move { Ok(engine) }).await?
                    }
                    _ => engine,
                }
            }
        };

        engine.authenticate().await?;
        engine.sync(&model).await?;
        info!(table = %model.table, shared, "adapter connected");
        self.engine = Some(engine);
        Ok(())
    }

    /// Releases this adapter's connection handle.
    ///
    /// Exclusive handles close immediately. In shared mode this only drops
    /// the local reference; the shared connection stays open for the rest
    /// of the process, and there is no guarantee it is ever closed before
    /// process teardown.
    pub async fn disconnect(&mut self) -> Result<(), AdapterError> {
        let Some(engine) = self.engine.take() else {
            return Ok(());
        };
        let shared = self.shared_mode();
        if shared {
            warn!("disconnect in shared mode leaves the connection open");
        }
        match &self.registry {
            Some(registry) => registry.release(engine, shared).await,
            None => engine.close().await,
        }
    }

    /// The live engine handle, if connected.
    pub fn engine(&self) -> Option<&Arc<dyn StorageEngine>> {
        self.engine.as_ref()
    }

    /// Finds all entities matching the filter object.
    pub async fn find(&self, filters: Option<&FilterParams>) -> Result<Vec<Entity>, AdapterError> {
        let (engine, model) = self.live()?;
        let plan = QueryPlan::build(filters);
        engine.find_all(model, &plan).await
    }

    /// Finds the first entity matching a predicate.
    pub async fn find_one(&self, predicate: &Predicate) -> Result<Option<Entity>, AdapterError> {
        let (engine, model) = self.live()?;
        engine.find_one(model, predicate).await
    }

    pub async fn find_by_id(&self, id: &Value) -> Result<Option<Entity>, AdapterError> {
        let (engine, model) = self.live()?;
        engine.find_by_id(model, id).await
    }

    /// Finds all entities whose id is in `ids`.
    ///
    /// An empty id list places no restriction at all: the fetch returns
    /// the entire collection, not an empty result. Callers that want
    /// "nothing for no ids" must short-circuit themselves.
    pub async fn find_by_ids(&self, ids: &[Value]) -> Result<Vec<Entity>, AdapterError> {
        let (engine, model) = self.live()?;
        let plan = if ids.is_empty() {
            QueryPlan::default()
        } else {
            QueryPlan {
                predicate: Predicate::is_in(model.id_column.clone(), ids.to_vec()),
                ..Default::default()
            }
        };
        engine.find_all(model, &plan).await
    }

    /// Counts the entities matching the filter object.
    pub async fn count(&self, filters: Option<&FilterParams>) -> Result<u64, AdapterError> {
        let (engine, model) = self.live()?;
        let plan = QueryPlan::build(filters);
        engine.count(model, &plan).await
    }

    /// Inserts one entity and returns the created instance.
    pub async fn insert(&self, record: &Record) -> Result<Entity, AdapterError> {
        let (engine, model) = self.live()?;
        engine.create(model, record).await
    }

    /// Inserts a batch, one independent create per record, awaited
    /// concurrently.
    ///
    /// The first failing create fails the whole batch. Creates that already
    /// completed are not rolled back, and creates not yet polled never run;
    /// there is no transactional atomicity at this layer.
    pub async fn insert_many(&self, records: &[Record]) -> Result<Vec<Entity>, AdapterError> {
        let (engine, model) = self.live()?;
        try_join_all(records.iter().map(|record| engine.create(model, record))).await
    }

    /// Applies `patch` to every entity matching `predicate`; returns the
    /// number of affected entities.
    pub async fn update_many(
        &self,
        predicate: &Predicate,
        patch: &Record,
    ) -> Result<u64, AdapterError> {
        let (engine, model) = self.live()?;
        engine.update(model, predicate, patch).await
    }

    /// Fetches the entity by id, then applies the patch to it.
    ///
    /// A missing entity is reported as [`AdapterError::NotFound`] before
    /// any mutation is attempted.
    pub async fn update_by_id(&self, id: &Value, patch: &Record) -> Result<Entity, AdapterError> {
        let (engine, model) = self.live()?;
        let entity = engine
            .find_by_id(model, id)
            .await?
            .ok_or(AdapterError::NotFound)?;

        let predicate = Predicate::Cmp(model.id_column.clone(), CmpOp::Eq, id.clone());
        engine.update(model, &predicate, patch).await?;

        let mut fields = entity.into_object();
        fields.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(Entity::new(model.table.clone(), fields))
    }

    /// Removes every entity matching `predicate`; returns the number of
    /// removed entities.
    pub async fn remove_many(&self, predicate: &Predicate) -> Result<u64, AdapterError> {
        let (engine, model) = self.live()?;
        engine.destroy(model, predicate).await
    }

    /// Fetches the entity by id, removes it, and returns the removed
    /// instance.
    ///
    /// A missing entity is reported as [`AdapterError::NotFound`] before
    /// any deletion is attempted.
    pub async fn remove_by_id(&self, id: &Value) -> Result<Entity, AdapterError> {
        let (engine, model) = self.live()?;
        let entity = engine
            .find_by_id(model, id)
            .await?
            .ok_or(AdapterError::NotFound)?;

        let predicate = Predicate::Cmp(model.id_column.clone(), CmpOp::Eq, id.clone());
        engine.destroy(model, &predicate).await?;
        Ok(entity)
    }

    /// Removes every entity in the collection.
    pub async fn clear(&self) -> Result<u64, AdapterError> {
        let (engine, model) = self.live()?;
        engine.destroy(model, &Predicate::All).await
    }

    /// Projects an entity to a plain field-keyed record, free of engine
    /// metadata.
    pub fn entity_to_object(&self, entity: Entity) -> Record {
        entity.into_object()
    }

    /// Executes a raw statement against the engine.
    pub async fn raw_query(
        &self,
        statement: &str,
        options: &RawOptions,
        kind: QueryKind,
    ) -> Result<RawOutcome, AdapterError> {
        let (engine, _) = self.live()?;
        engine.raw_query(statement, options, kind).await
    }

    fn shared_mode(&self) -> bool {
        match &self.source {
            EngineSource::Settings(settings) => {
                settings.shared_connection && self.registry.is_some()
            }
            EngineSource::Injected(_) => self.registry.is_some(),
        }
    }

    fn live(&self) -> Result<(&Arc<dyn StorageEngine>, &ModelDef), AdapterError> {
        let engine = self.engine.as_ref().ok_or_else(|| {
            AdapterError::Configuration("adapter is not connected; call `connect` first".to_string())
        })?;
        let model = self.model.as_ref().ok_or_else(|| {
            AdapterError::Configuration("adapter is not initialized; call `init` first".to_string())
        })?;
        Ok((engine, model))
    }
}
