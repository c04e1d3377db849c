// Integration tests for TrackedDocument::rollback.
// Covers persisted and in-memory rollbacks, overrides and the two failure cases.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{fields, memory_store, ops_json, posts};
use patchlog_core::DocumentId;
use patchlog_engine::{TrackedCollection, TrackedDocument};
use serde_json::{json, Map};

/// Document titled foo, then bar, then baz: three patches.
async fn three_revisions(posts: &TrackedCollection) -> TrackedDocument {
    let mut doc = posts.create(fields(json!({ "title": "foo" }))).await.unwrap();
    for title in ["bar", "baz"] {
        doc.set("title", json!(title));
        posts.save(&mut doc).await.unwrap();
    }
    doc
}

#[tokio::test]
async fn test_rollback_persists_and_records_patch() {
    let posts = posts(memory_store());
    let mut doc = three_revisions(&posts).await;
    let patches = doc.patches().all().await.unwrap();

    doc.rollback(&patches[1].id, Map::new(), true).await.unwrap();

    assert_eq!(doc.data(), json!({ "title": "bar", "active": false }));
    let stored = posts.find_by_id(doc.id()).await.unwrap().unwrap();
    assert_eq!(stored.data(), json!({ "title": "bar", "active": false }));

    let after = doc.patches().all().await.unwrap();
    assert_eq!(after.len(), 4);
    assert_eq!(
        ops_json(&after[3]),
        json!([{ "op": "replace", "path": "/title", "value": "bar" }])
    );
}

#[tokio::test]
async fn test_rollback_without_persist_leaves_store_untouched() {
    let posts = posts(memory_store());
    let mut doc = three_revisions(&posts).await;
    let patches = doc.patches().all().await.unwrap();

    doc.rollback(&patches[1].id, Map::new(), false).await.unwrap();

    assert_eq!(doc.get("title"), Some(&json!("bar")));
    assert!(doc.is_modified());
    assert_eq!(doc.patches().count().await.unwrap(), 3);
    let stored = posts.find_by_id(doc.id()).await.unwrap().unwrap();
    assert_eq!(stored.get("title"), Some(&json!("baz")));
}

#[tokio::test]
async fn test_rollback_to_first_patch() {
    let posts = posts(memory_store());
    let mut doc = three_revisions(&posts).await;
    let patches = doc.patches().all().await.unwrap();

    doc.rollback(&patches[0].id, Map::new(), true).await.unwrap();

    assert_eq!(doc.data(), json!({ "title": "foo", "active": false }));
}

#[tokio::test]
async fn test_rollback_merges_overrides() {
    let posts = posts(memory_store());
    let mut doc = three_revisions(&posts).await;
    let patches = doc.patches().all().await.unwrap();

    doc.rollback(&patches[0].id, common::fields(json!({ "active": true })), true)
        .await
        .unwrap();

    assert_eq!(doc.data(), json!({ "title": "foo", "active": true }));
    let latest = doc.patches().latest().await.unwrap().unwrap();
    assert_eq!(
        ops_json(&latest),
        json!([
            { "op": "replace", "path": "/active", "value": true },
            { "op": "replace", "path": "/title", "value": "foo" }
        ])
    );
}

#[tokio::test]
async fn test_rollback_to_latest_fails() {
    let posts = posts(memory_store());
    let mut doc = three_revisions(&posts).await;
    let latest = doc.patches().latest().await.unwrap().unwrap();

    let err = doc.rollback(&latest.id, Map::new(), true).await.unwrap_err();

    assert!(err.is_rollback());
    assert_eq!(err.message(), "rollback to latest patch");
    assert_eq!(doc.get("title"), Some(&json!("baz")));
    assert_eq!(doc.patches().count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_rollback_to_unknown_patch_fails() {
    let posts = posts(memory_store());
    let mut doc = three_revisions(&posts).await;

    let err = doc
        .rollback(&DocumentId::from("no-such-patch"), Map::new(), true)
        .await
        .unwrap_err();

    assert!(err.is_rollback());
    assert_eq!(err.message(), "patch doesn't exist");
}

#[tokio::test]
async fn test_rollback_ignores_other_documents_patches() {
    let posts = posts(memory_store());
    let mut doc = three_revisions(&posts).await;
    let other = three_revisions(&posts).await;
    let foreign = other.patches().all().await.unwrap();

    let err = doc
        .rollback(&foreign[0].id, Map::new(), true)
        .await
        .unwrap_err();

    assert!(err.is_rollback());
}

#[tokio::test]
async fn test_rollback_keeps_excluded_fields() {
    let posts = common::tracked(
        common::post_spec(),
        common::post_history(memory_store())
            .exclude("/secret")
            .exclude("/profile/hash"),
    );
    let mut doc = posts
        .create(fields(json!({
            "title": "foo",
            "secret": "hash",
            "profile": { "name": "a", "hash": "h" }
        })))
        .await
        .unwrap();
    doc.set("title", json!("bar"));
    posts.save(&mut doc).await.unwrap();
    let patches = doc.patches().all().await.unwrap();

    doc.rollback(&patches[0].id, Map::new(), true).await.unwrap();

    let stored = posts.find_by_id(doc.id()).await.unwrap().unwrap();
    assert_eq!(stored.get("secret"), Some(&json!("hash")));
    assert_eq!(
        stored.data(),
        json!({
            "title": "foo",
            "secret": "hash",
            "profile": { "name": "a", "hash": "h" },
            "active": false
        })
    );

    let latest = doc.patches().latest().await.unwrap().unwrap();
    assert_eq!(
        ops_json(&latest),
        json!([{ "op": "replace", "path": "/title", "value": "foo" }])
    );
}
