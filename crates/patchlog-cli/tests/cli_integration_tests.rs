//! CLI integration tests
//!
//! Seed a SQLite store through the engine, then drive the `patchlog` binary
//! against it.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

use patchlog_core::DocumentId;
use patchlog_engine::{ModelSpec, PatchHistory, TrackedCollection};
use patchlog_store::SqliteStore;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

fn collection(db: &Path) -> TrackedCollection {
    collection_excluding(db, &[])
}

fn collection_excluding(db: &Path, excludes: &[&str]) -> TrackedCollection {
    let store = SqliteStore::open(db).unwrap();
    let mut builder = PatchHistory::builder("posts")
        .store(Arc::new(store))
        .name("postPatches");
    for path in excludes {
        builder = builder.exclude(*path);
    }
    let history = builder.build().unwrap();
    TrackedCollection::new(ModelSpec::new("posts"), Arc::new(history)).unwrap()
}

/// `doc-1` titled foo, bar, baz. Returns the patch ids oldest first.
async fn seed(db: &Path) -> Vec<String> {
    let posts = collection(db);
    let mut fields = Map::new();
    fields.insert("title".to_string(), json!("foo"));
    let mut doc = posts.new_document_with_id(DocumentId::from("doc-1"), fields);
    posts.save(&mut doc).await.unwrap();
    for title in ["bar", "baz"] {
        doc.set("title", json!(title));
        posts.save(&mut doc).await.unwrap();
    }
    doc.patches()
        .all()
        .await
        .unwrap()
        .iter()
        .map(|p| p.id.to_string())
        .collect()
}

fn run(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_patchlog"))
        .args(args)
        .args([
            "--db",
            db.to_str().unwrap(),
            "--collection",
            "posts",
            "--name",
            "postPatches",
            "--id",
            "doc-1",
        ])
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[tokio::test]
async fn test_cli_log_prints_patches_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let ids = seed(&db).await;

    let out = stdout(&run(&db, &["log"]));

    let lines: Vec<Value> = out
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    for (line, id) in lines.iter().zip(&ids) {
        assert_eq!(line["id"], json!(id));
        assert_eq!(line["ref"], json!("doc-1"));
    }
    assert_eq!(
        lines[1]["ops"],
        json!([{ "op": "replace", "path": "/title", "value": "bar" }])
    );
}

#[tokio::test]
async fn test_cli_show_reconstructs_state() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let ids = seed(&db).await;

    let out = stdout(&run(&db, &["show", "--patch", &ids[0]]));
    let state: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(state, json!({ "title": "foo" }));

    // The newest patch is a valid target for show
    let out = stdout(&run(&db, &["show", "--patch", &ids[2]]));
    let state: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(state, json!({ "title": "baz" }));
}

#[tokio::test]
async fn test_cli_rollback_dry_run_saves_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let ids = seed(&db).await;

    let out = stdout(&run(&db, &["rollback", "--patch", &ids[1], "--dry-run"]));
    let state: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(state, json!({ "title": "bar" }));

    let posts = collection(&db);
    let doc = posts.find_by_id(&DocumentId::from("doc-1")).await.unwrap().unwrap();
    assert_eq!(doc.get("title"), Some(&json!("baz")));
    assert_eq!(doc.patches().count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_cli_rollback_persists() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let ids = seed(&db).await;

    stdout(&run(&db, &["rollback", "--patch", &ids[0]]));

    let posts = collection(&db);
    let doc = posts.find_by_id(&DocumentId::from("doc-1")).await.unwrap().unwrap();
    assert_eq!(doc.get("title"), Some(&json!("foo")));
    assert_eq!(doc.patches().count().await.unwrap(), 4);
}

#[tokio::test]
async fn test_cli_rollback_to_latest_fails() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let ids = seed(&db).await;

    let output = run(&db, &["rollback", "--patch", &ids[2]]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("rollback to latest patch"),
        "unexpected stderr: {}",
        stderr
    );
}

#[tokio::test]
async fn test_cli_rollback_honors_exclusions() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");

    let posts = collection_excluding(&db, &["/secret"]);
    let mut fields = Map::new();
    fields.insert("title".to_string(), json!("foo"));
    fields.insert("secret".to_string(), json!("s1"));
    let mut doc = posts.new_document_with_id(DocumentId::from("doc-1"), fields);
    posts.save(&mut doc).await.unwrap();
    doc.set("title", json!("bar"));
    posts.save(&mut doc).await.unwrap();
    let first = doc.patches().all().await.unwrap()[0].id.to_string();

    stdout(&run(&db, &["rollback", "--patch", &first, "--exclude", "/secret"]));

    let doc = posts.find_by_id(&DocumentId::from("doc-1")).await.unwrap().unwrap();
    assert_eq!(doc.get("title"), Some(&json!("foo")));
    assert_eq!(doc.get("secret"), Some(&json!("s1")));

    let patches = doc.patches().all().await.unwrap();
    assert_eq!(patches.len(), 3);
    for patch in &patches {
        let ops = serde_json::to_string(&patch.ops).unwrap();
        assert!(!ops.contains("/secret"), "secret leaked into {ops}");
    }
}

#[test]
fn test_cli_rejects_bad_include() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");

    let output = run(&db, &["log", "--include", "user:text"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown kind"), "unexpected stderr: {}", stderr);
}
