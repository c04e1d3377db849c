#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use patchlog_core::{
    Document, ExError, ExErrorKind, IncludeField, PatchRecord, Result, ValueKind,
};
use patchlog_engine::{ModelSpec, PatchHistory, PatchHistoryBuilder, TrackedCollection};
use patchlog_store::{
    DocumentStore, Filter, MemoryStore, SqliteStore, Update, UpdateOptions, UpdateResult,
};
use serde_json::{json, Map, Value};

/// Object literal as a field map.
pub fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("fields must be an object, got {other}"),
    }
}

pub fn memory_store() -> Arc<dyn DocumentStore> {
    Arc::new(MemoryStore::new())
}

/// SQLite-backed store in a fresh temp directory. Keep the guard alive.
pub fn sqlite_store() -> (Arc<dyn DocumentStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SqliteStore::open(dir.path().join("store.db")).expect("open sqlite store");
    (Arc::new(store), dir)
}

/// History for `posts` with the includes most tests use.
pub fn post_history(store: Arc<dyn DocumentStore>) -> PatchHistoryBuilder {
    PatchHistory::builder("posts")
        .store(store)
        .name("postPatches")
        .include("user", IncludeField::new(ValueKind::String))
        .include("reason", IncludeField::new(ValueKind::String))
        .include("version", IncludeField::new(ValueKind::Number).from("__v"))
}

/// `posts` model: `active` defaults to false, timestamps on.
pub fn post_spec() -> ModelSpec {
    ModelSpec::new("posts")
        .with_default("active", json!(false))
        .with_timestamps()
}

pub fn tracked(spec: ModelSpec, history: PatchHistoryBuilder) -> TrackedCollection {
    let history = history.build().expect("valid history options");
    TrackedCollection::new(spec, Arc::new(history)).expect("matching collection")
}

pub fn posts(store: Arc<dyn DocumentStore>) -> TrackedCollection {
    tracked(post_spec(), post_history(store))
}

pub fn ops_json(patch: &PatchRecord) -> Value {
    serde_json::to_value(&patch.ops).expect("ops serialize")
}

/// Store whose inserts and deletes in one collection fail once armed.
/// Everything else goes to the wrapped store.
pub struct FailingStore {
    inner: Arc<dyn DocumentStore>,
    collection: String,
    armed: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn DocumentStore>, collection: &str) -> Arc<Self> {
        Arc::new(Self {
            inner,
            collection: collection.to_string(),
            armed: AtomicBool::new(false),
        })
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    fn check(&self, collection: &str, op: &str) -> Result<()> {
        if self.armed.load(Ordering::SeqCst) && collection == self.collection {
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_op(op)
                .with_message(format!("{op} rejected for {collection}")));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        self.inner.find(collection, filter).await
    }

    async fn insert(&self, collection: &str, doc: &Document) -> Result<()> {
        self.check(collection, "insert")?;
        self.inner.insert(collection, doc).await
    }

    async fn replace(&self, collection: &str, doc: &Document) -> Result<bool> {
        self.inner.replace(collection, doc).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        options: &UpdateOptions,
    ) -> Result<UpdateResult> {
        self.inner.update_one(collection, filter, update, options).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        options: &UpdateOptions,
    ) -> Result<UpdateResult> {
        self.inner.update_many(collection, filter, update, options).await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64> {
        self.check(collection, "delete_one")?;
        self.inner.delete_one(collection, filter).await
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64> {
        self.check(collection, "delete_many")?;
        self.inner.delete_many(collection, filter).await
    }

    async fn collection_names(&self) -> Result<Vec<String>> {
        self.inner.collection_names().await
    }
}
