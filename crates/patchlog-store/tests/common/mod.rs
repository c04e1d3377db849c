use patchlog_core::{Document, DocumentId};
use patchlog_store::{MemoryStore, SqliteStore};
use serde_json::Value;

/// Build a document from a JSON object literal.
#[allow(dead_code)]
pub fn doc(id: &str, fields: Value) -> Document {
    let fields = match fields {
        Value::Object(map) => map,
        other => panic!("document fields must be an object, got {other}"),
    };
    Document::with_fields(DocumentId::from(id), fields)
}

#[allow(dead_code)]
pub fn memory_store() -> MemoryStore {
    MemoryStore::new()
}

/// SQLite store in a fresh temp directory. Keep the guard alive.
#[allow(dead_code)]
pub fn sqlite_store() -> (SqliteStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SqliteStore::open(dir.path().join("store.db")).expect("open sqlite store");
    (store, dir)
}
