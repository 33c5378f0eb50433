//! Behavior tests for the adapter facade over an in-memory engine double.

use adapter::{
    AdapterError, ConnectionRegistry, Entity, ModelDef, QueryKind, QueryPlan, RawOptions,
    RawOutcome, Record, ServiceSchema, SqlAdapter, StorageEngine,
};
use async_trait::async_trait;
use core_types::{CmpOp, FilterParams, Predicate, SearchFields, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory stand-in for the storage engine.
///
/// Rows live in a plain vector; predicates are evaluated structurally. A
/// create whose `title` equals `fail_on_title` errors, for exercising batch
/// failure paths.
#[derive(Default)]
struct MockEngine {
    rows: Mutex<Vec<Record>>,
    fail_on_title: Option<String>,
    fail_authentication: bool,
    authenticate_calls: AtomicUsize,
    synced_table: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl MockEngine {
    fn with_rows(rows: Vec<Record>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    fn titles(&self) -> Vec<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter_map(|row| row.get("title")?.as_text().map(str::to_string))
            .collect()
    }
}

fn matches(record: &Record, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::All => true,
        Predicate::Cmp(field, CmpOp::Eq, value) => record.get(field) == Some(value),
        Predicate::Cmp(field, CmpOp::Ne, value) => record.get(field) != Some(value),
        Predicate::Cmp(field, op, value) => {
            let (Some(lhs), Some(rhs)) = (record.get(field).and_then(Value::as_int), value.as_int())
            else {
                return false;
            };
            match op {
                CmpOp::Gt => lhs > rhs,
                CmpOp::Gte => lhs >= rhs,
                CmpOp::Lt => lhs < rhs,
                CmpOp::Lte => lhs <= rhs,
                CmpOp::Eq | CmpOp::Ne => unreachable!(),
            }
        }
        Predicate::Like(field, needle) => record
            .get(field)
            .and_then(Value::as_text)
            .is_some_and(|text| text.contains(needle.as_str())),
        Predicate::In(field, values) => record
            .get(field)
            .is_some_and(|value| values.contains(value)),
        Predicate::And(clauses) => clauses.iter().all(|clause| matches(record, clause)),
        Predicate::Or(clauses) => clauses.iter().any(|clause| matches(record, clause)),
    }
}

#[async_trait]
impl StorageEngine for MockEngine {
    async fn authenticate(&self) -> Result<(), AdapterError> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_authentication {
            return Err(AdapterError::Connection("handshake refused".to_string()));
        }
        Ok(())
    }

    async fn sync(&self, model: &ModelDef) -> Result<(), AdapterError> {
        *self.synced_table.lock().unwrap() = Some(model.table.clone());
        Ok(())
    }

    async fn create(&self, model: &ModelDef, record: &Record) -> Result<Entity, AdapterError> {
        if let (Some(marker), Some(title)) = (
            self.fail_on_title.as_deref(),
            record.get("title").and_then(Value::as_text),
        ) {
            if marker == title {
                return Err(sqlx::Error::Protocol("simulated create failure".into()).into());
            }
        }
        self.rows.lock().unwrap().push(record.clone());
        Ok(Entity::new(model.table.clone(), record.clone()))
    }

    async fn find_all(
        &self,
        model: &ModelDef,
        plan: &QueryPlan,
    ) -> Result<Vec<Entity>, AdapterError> {
        let rows = self.rows.lock().unwrap();
        let mut selected: Vec<Record> = rows
            .iter()
            .filter(|row| matches(row, &plan.predicate))
            .cloned()
            .collect();
        if let Some(offset) = plan.offset {
            selected.drain(..usize::min(offset as usize, selected.len()));
        }
        if let Some(limit) = plan.limit {
            selected.truncate(limit as usize);
        }
        Ok(selected
            .into_iter()
            .map(|row| Entity::new(model.table.clone(), row))
            .collect())
    }

    async fn find_one(
        &self,
        model: &ModelDef,
        predicate: &Predicate,
    ) -> Result<Option<Entity>, AdapterError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|row| matches(row, predicate))
            .map(|row| Entity::new(model.table.clone(), row.clone())))
    }

    async fn find_by_id(
        &self,
        model: &ModelDef,
        id: &Value,
    ) -> Result<Option<Entity>, AdapterError> {
        let predicate = Predicate::Cmp(model.id_column.clone(), CmpOp::Eq, id.clone());
        self.find_one(model, &predicate).await
    }

    async fn count(&self, _model: &ModelDef, plan: &QueryPlan) -> Result<u64, AdapterError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().filter(|row| matches(row, &plan.predicate)).count() as u64)
    }

    async fn update(
        &self,
        _model: &ModelDef,
        predicate: &Predicate,
        patch: &Record,
    ) -> Result<u64, AdapterError> {
        let mut rows = self.rows.lock().unwrap();
        let mut affected = 0;
        for row in rows.iter_mut().filter(|row| matches(row, predicate)) {
            row.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
            affected += 1;
        }
        Ok(affected)
    }

    async fn destroy(&self, _model: &ModelDef, predicate: &Predicate) -> Result<u64, AdapterError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| !matches(row, predicate));
        Ok((before - rows.len()) as u64)
    }

    async fn raw_query(
        &self,
        _statement: &str,
        _options: &RawOptions,
        kind: QueryKind,
    ) -> Result<RawOutcome, AdapterError> {
        match kind {
            QueryKind::Select => Ok(RawOutcome::Rows(self.rows.lock().unwrap().clone())),
            _ => Ok(RawOutcome::Affected(0)),
        }
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn post(id: i64, title: &str) -> Record {
    record(&[("id", Value::Int(id)), ("title", Value::from(title))])
}

fn posts_schema() -> ServiceSchema {
    ServiceSchema::new("posts", ModelDef::new("posts"))
}

/// An initialized, connected adapter over the given engine.
async fn connected(engine: Arc<MockEngine>) -> SqlAdapter {
    let mut adapter = SqlAdapter::with_engine(engine);
    adapter.init(&posts_schema()).unwrap();
    adapter.connect().await.unwrap();
    adapter
}

#[tokio::test]
async fn init_rejects_a_schema_without_a_model() {
    let mut adapter = SqlAdapter::with_engine(Arc::new(MockEngine::default()));
    let schema = ServiceSchema {
        name: "posts".to_string(),
        model: None,
    };
    assert!(matches!(
        adapter.init(&schema),
        Err(AdapterError::Configuration(_))
    ));
}

#[tokio::test]
async fn connect_authenticates_and_syncs_the_model() {
    let engine = Arc::new(MockEngine::default());
    let adapter = connected(Arc::clone(&engine)).await;

    assert_eq!(engine.authenticate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        engine.synced_table.lock().unwrap().as_deref(),
        Some("posts")
    );
    assert!(adapter.engine().is_some());
}

#[tokio::test]
async fn connect_fails_without_init() {
    let mut adapter = SqlAdapter::with_engine(Arc::new(MockEngine::default()));
    assert!(matches!(
        adapter.connect().await,
        Err(AdapterError::Configuration(_))
    ));
}

#[tokio::test]
async fn a_failed_handshake_fails_connect_without_retry() {
    let engine = Arc::new(MockEngine {
        fail_authentication: true,
        ..Default::default()
    });
    let mut adapter =
        SqlAdapter::with_engine(Arc::clone(&engine) as Arc<dyn StorageEngine>);
    adapter.init(&posts_schema()).unwrap();

    assert!(matches!(
        adapter.connect().await,
        Err(AdapterError::Connection(_))
    ));
    assert_eq!(engine.authenticate_calls.load(Ordering::SeqCst), 1);
    assert!(adapter.engine().is_none());
}

#[tokio::test]
async fn find_by_ids_with_an_empty_list_returns_the_whole_collection() {
    let engine = Arc::new(MockEngine::with_rows(vec![
        post(1, "first"),
        post(2, "second"),
        post(3, "third"),
    ]));
    let adapter = connected(engine).await;

    // The documented quirk: no ids means no restriction, not no results.
    let all = adapter.find_by_ids(&[]).await.unwrap();
    assert_eq!(all.len(), 3);

    let some = adapter
        .find_by_ids(&[Value::Int(1), Value::Int(3)])
        .await
        .unwrap();
    let titles: Vec<_> = some
        .iter()
        .map(|e| e.get("title").unwrap().as_text().unwrap())
        .collect();
    assert_eq!(titles, vec!["first", "third"]);
}

#[tokio::test]
async fn find_translates_search_filters() {
    let engine = Arc::new(MockEngine::with_rows(vec![
        post(1, "rust adapters"),
        post(2, "cooking"),
    ]));
    let adapter = connected(engine).await;

    let filters = FilterParams {
        search: Some("rust".to_string()),
        search_fields: Some(SearchFields::Spaced("title".to_string())),
        ..Default::default()
    };
    let found = adapter.find(Some(&filters)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("title").unwrap().as_text(), Some("rust adapters"));
}

#[tokio::test]
async fn a_search_without_fields_matches_nothing() {
    let engine = Arc::new(MockEngine::with_rows(vec![post(1, "abc")]));
    let adapter = connected(engine).await;

    let filters = FilterParams {
        search: Some("abc".to_string()),
        ..Default::default()
    };
    assert!(adapter.find(Some(&filters)).await.unwrap().is_empty());
    assert_eq!(adapter.count(Some(&filters)).await.unwrap(), 0);
}

#[tokio::test]
async fn count_without_filters_counts_everything() {
    let engine = Arc::new(MockEngine::with_rows(vec![post(1, "a"), post(2, "b")]));
    let adapter = connected(engine).await;
    assert_eq!(adapter.count(None).await.unwrap(), 2);
}

#[tokio::test]
async fn update_by_id_returns_not_found_for_a_missing_entity() {
    let adapter = connected(Arc::new(MockEngine::default())).await;
    let patch = record(&[("title", Value::from("renamed"))]);
    assert!(matches!(
        adapter.update_by_id(&Value::Int(42), &patch).await,
        Err(AdapterError::NotFound)
    ));
}

#[tokio::test]
async fn update_by_id_patches_and_returns_the_entity() {
    let engine = Arc::new(MockEngine::with_rows(vec![post(1, "draft")]));
    let adapter = connected(Arc::clone(&engine)).await;

    let patch = record(&[("title", Value::from("published"))]);
    let updated = adapter.update_by_id(&Value::Int(1), &patch).await.unwrap();

    assert_eq!(updated.get("title").unwrap().as_text(), Some("published"));
    assert_eq!(engine.titles(), vec!["published"]);
}

#[tokio::test]
async fn remove_by_id_returns_the_removed_entity() {
    let engine = Arc::new(MockEngine::with_rows(vec![post(1, "a"), post(2, "b")]));
    let adapter = connected(Arc::clone(&engine)).await;

    let removed = adapter.remove_by_id(&Value::Int(1)).await.unwrap();
    assert_eq!(removed.get("title").unwrap().as_text(), Some("a"));
    assert_eq!(engine.titles(), vec!["b"]);

    assert!(matches!(
        adapter.remove_by_id(&Value::Int(1)).await,
        Err(AdapterError::NotFound)
    ));
}

#[tokio::test]
async fn update_many_reports_the_affected_count() {
    let engine = Arc::new(MockEngine::with_rows(vec![post(1, "x"), post(2, "x")]));
    let adapter = connected(engine).await;

    let affected = adapter
        .update_many(
            &Predicate::eq("title", "x"),
            &record(&[("title", Value::from("y"))]),
        )
        .await
        .unwrap();
    assert_eq!(affected, 2);
}

#[tokio::test]
async fn clear_removes_every_entity() {
    let engine = Arc::new(MockEngine::with_rows(vec![post(1, "a"), post(2, "b")]));
    let adapter = connected(Arc::clone(&engine)).await;

    assert_eq!(adapter.clear().await.unwrap(), 2);
    assert!(engine.titles().is_empty());
}

#[tokio::test]
async fn insert_many_aborts_on_the_first_failure_without_rollback() {
    let engine = Arc::new(MockEngine {
        fail_on_title: Some("boom".to_string()),
        ..Default::default()
    });
    let adapter = connected(Arc::clone(&engine)).await;

    let batch = vec![post(1, "first"), post(2, "boom"), post(3, "third")];
    let result = adapter.insert_many(&batch).await;
    assert!(matches!(result, Err(AdapterError::Engine(_))));

    // try_join_all polls the creates in order: the first completed before
    // the failure and stays persisted; the third was never polled and never
    // ran. No rollback either way.
    assert_eq!(engine.titles(), vec!["first"]);
}

#[tokio::test]
async fn insert_many_returns_entities_in_input_order() {
    let engine = Arc::new(MockEngine::default());
    let adapter = connected(Arc::clone(&engine)).await;

    let batch = vec![post(1, "a"), post(2, "b"), post(3, "c")];
    let created = adapter.insert_many(&batch).await.unwrap();
    let titles: Vec<_> = created
        .iter()
        .map(|e| e.get("title").unwrap().as_text().unwrap())
        .collect();
    assert_eq!(titles, vec!["a", "b", "c"]);
    assert_eq!(engine.titles(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn entity_to_object_strips_engine_metadata() {
    let engine = Arc::new(MockEngine::with_rows(vec![post(7, "plain")]));
    let adapter = connected(engine).await;

    let entity = adapter.find_by_id(&Value::Int(7)).await.unwrap().unwrap();
    let object = adapter.entity_to_object(entity);
    assert_eq!(object, post(7, "plain"));
}

#[tokio::test]
async fn raw_query_dispatches_on_the_query_kind() {
    let engine = Arc::new(MockEngine::with_rows(vec![post(1, "a")]));
    let adapter = connected(engine).await;

    let rows = adapter
        .raw_query("SELECT * FROM posts", &RawOptions::default(), QueryKind::Select)
        .await
        .unwrap();
    assert!(matches!(rows, RawOutcome::Rows(ref records) if records.len() == 1));

    let affected = adapter
        .raw_query(
            "DELETE FROM posts",
            &RawOptions::default(),
            QueryKind::from_name("delete").unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(affected, RawOutcome::Affected(0));
}

#[tokio::test]
async fn exclusive_disconnect_closes_the_engine() {
    let engine = Arc::new(MockEngine::default());
    let mut adapter = connected(Arc::clone(&engine)).await;

    adapter.disconnect().await.unwrap();
    assert!(engine.closed.load(Ordering::SeqCst));
    assert!(adapter.engine().is_none());
}

#[tokio::test]
async fn shared_disconnect_leaves_the_connection_open() {
    let registry = Arc::new(ConnectionRegistry::new());
    let engine = Arc::new(MockEngine::default());

    let mut adapter = SqlAdapter::with_shared_engine(
        Arc::clone(&engine) as Arc<dyn StorageEngine>,
        Arc::clone(&registry),
    );
    adapter.init(&posts_schema()).unwrap();
    adapter.connect().await.unwrap();

    adapter.disconnect().await.unwrap();
    assert!(!engine.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn shared_adapters_reuse_one_handle_and_reauthenticate() {
    let registry = Arc::new(ConnectionRegistry::new());
    let engine = Arc::new(MockEngine::default());

    let mut first = SqlAdapter::with_shared_engine(
        Arc::clone(&engine) as Arc<dyn StorageEngine>,
        Arc::clone(&registry),
    );
    first.init(&posts_schema()).unwrap();
    first.connect().await.unwrap();

    let mut second = SqlAdapter::with_shared_engine(
        Arc::clone(&engine) as Arc<dyn StorageEngine>,
        Arc::clone(&registry),
    );
    second.init(&posts_schema()).unwrap();
    second.connect().await.unwrap();

    // Both adapters hold the same handle; the handshake still ran once per
    // connect, reused handle or not.
    assert!(Arc::ptr_eq(first.engine().unwrap(), second.engine().unwrap()));
    assert_eq!(engine.authenticate_calls.load(Ordering::SeqCst), 2);
}
