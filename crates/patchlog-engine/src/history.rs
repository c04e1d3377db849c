//! Patch history coordinator.
//!
//! ## Logging Ownership
//!
//! The coordinator owns lifecycle logging for patch operations:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Store and core layers only use `tracing::debug!()` for internal details.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::try_join_all;
use patchlog_core::core_types::OperationId;
use patchlog_core::errors::{ExError, ExErrorKind, PatchLogError};
use patchlog_core::model::document::ID_FIELD;
use patchlog_core::{
    detect_changes, log_op_end, log_op_error, log_op_start, Document, DocumentId, IncludeField,
    PatchHistoryOptions, PatchRecord, Result, Transforms, ValidatedOptions,
};
use patchlog_store::{DocumentStore, Filter, Update, UpdateResult};
use serde_json::{Map, Value};

use crate::hooks::{LifecycleHooks, UpdateCapture, UpdateContext};
use crate::patches::PatchQuery;

/// Records one patch per mutation of a tracked collection.
pub struct PatchHistory {
    store: Arc<dyn DocumentStore>,
    tracked_collection: String,
    options: ValidatedOptions,
}

impl std::fmt::Debug for PatchHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchHistory")
            .field("tracked_collection", &self.tracked_collection)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl PatchHistory {
    /// Start configuring history for `tracked_collection`.
    pub fn builder(tracked_collection: impl Into<String>) -> PatchHistoryBuilder {
        PatchHistoryBuilder {
            tracked_collection: tracked_collection.into(),
            store: None,
            options: PatchHistoryOptions::new(""),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn tracked_collection(&self) -> &str {
        &self.tracked_collection
    }

    /// Collection the patch records live in.
    pub fn patch_collection(&self) -> &str {
        &self.options.collection_name
    }

    pub fn model_name(&self) -> &str {
        &self.options.model_name
    }

    pub fn options(&self) -> &ValidatedOptions {
        &self.options
    }

    /// Every patch of the tracked collection.
    pub fn patches(&self) -> PatchQuery {
        PatchQuery::new(Arc::clone(&self.store), self.patch_collection())
    }

    /// Patches of one document.
    pub fn patches_for(&self, id: &DocumentId) -> PatchQuery {
        self.patches().for_document(id)
    }

    /// Diff `doc` against `original` and persist a patch if anything is left
    /// after exclusions. `metadata` is the update-call side channel for
    /// included fields.
    pub async fn create_patch(
        &self,
        doc: &Document,
        original: &Value,
        metadata: &Map<String, Value>,
    ) -> Result<Option<PatchRecord>> {
        log_op_start!("create_patch", doc_id = %doc.id, collection = %self.tracked_collection);
        let start = Instant::now();

        let patch = self
            .create_patch_impl(doc, original, metadata)
            .await
            .map_err(|e| {
                log_op_error!(
                    "create_patch",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    doc_id = %doc.id
                );
                e
            })?;

        log_op_end!(
            "create_patch",
            duration_ms = start.elapsed().as_millis() as u64,
            doc_id = %doc.id,
            ops_len = patch.as_ref().map_or(0, |p| p.ops.len() as u64)
        );

        Ok(patch)
    }

    async fn create_patch_impl(
        &self,
        doc: &Document,
        original: &Value,
        metadata: &Map<String, Value>,
    ) -> Result<Option<PatchRecord>> {
        let ops = detect_changes(
            original,
            &doc.data(),
            &self.options.exclusions,
            self.options.track_original_value,
        );
        if ops.is_empty() {
            tracing::debug!(doc_id = %doc.id, "no changes to record");
            return Ok(None);
        }

        let date = doc.timestamp().unwrap_or_else(Utc::now);
        let mut patch = PatchRecord::new(doc.id.clone(), date, ops);
        patch.includes = self.resolve_includes(doc, metadata)?;

        self.store
            .insert(self.patch_collection(), &patch.to_document()?)
            .await?;
        Ok(Some(patch))
    }

    /// Included field values: the document first, then update metadata.
    /// Values of the wrong declared type are dropped.
    fn resolve_includes(
        &self,
        doc: &Document,
        metadata: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let mut includes = Map::new();
        for (name, field) in &self.options.includes {
            match resolve_include(name, field, doc, metadata) {
                Some(value) => {
                    includes.insert(name.clone(), value);
                }
                None if field.required => {
                    return Err(ExError::new(ExErrorKind::InvalidInput)
                        .with_op("create_patch")
                        .with_entity_id(doc.id.to_string())
                        .with_message(format!("include field `{}` is required", name)));
                }
                None => {}
            }
        }
        Ok(includes)
    }

    /// Delete every patch that references `id`.
    pub async fn delete_patches(&self, id: &DocumentId) -> Result<u64> {
        log_op_start!("delete_patches", doc_id = %id);
        let start = Instant::now();

        let deleted = self.delete_patches_impl(id).await.map_err(|e| {
            log_op_error!(
                "delete_patches",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                doc_id = %id
            );
            e
        })?;

        log_op_end!(
            "delete_patches",
            duration_ms = start.elapsed().as_millis() as u64,
            doc_id = %id,
            docs_len = deleted
        );
        Ok(deleted)
    }

    async fn delete_patches_impl(&self, id: &DocumentId) -> Result<u64> {
        let collection = self.patch_collection();
        let patches = self
            .store
            .find(collection, &Filter::all().eq("ref", id.to_value()))
            .await?;

        let deleted = try_join_all(patches.iter().map(|patch| {
            let filter = Filter::by_id(&patch.id);
            async move { self.store.delete_one(collection, &filter).await }
        }))
        .await?;
        Ok(deleted.into_iter().sum())
    }

    /// Documents an update touched, each with the snapshot to diff against.
    async fn resolve_updated(
        &self,
        ctx: &UpdateContext<'_>,
        result: &UpdateResult,
        capture: &UpdateCapture,
        limit: Option<usize>,
    ) -> Result<Vec<(Document, Value)>> {
        if !capture.is_empty() {
            let ids = capture.ids().map(DocumentId::to_value).collect();
            let found = self
                .store
                .find(ctx.collection, &Filter::all().any_of(ID_FIELD, ids))
                .await?;
            let mut by_id: HashMap<DocumentId, Document> =
                found.into_iter().map(|doc| (doc.id.clone(), doc)).collect();

            // Captured order decides the pairing; documents gone since are skipped
            return Ok(capture
                .captured()
                .iter()
                .filter_map(|(id, snapshot)| by_id.remove(id).map(|doc| (doc, snapshot.clone())))
                .collect());
        }

        let filter = match &result.upserted_id {
            Some(id) => Filter::by_id(id),
            None => merged_conditions(ctx.filter, ctx.update),
        };
        if filter.is_empty() {
            tracing::warn!(
                operation_id = %capture.operation_id(),
                "cannot locate upserted document without conditions"
            );
            return Ok(Vec::new());
        }

        let empty = Value::Object(Map::new());
        Ok(self
            .store
            .find(ctx.collection, &filter)
            .await?
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|doc| (doc, empty.clone()))
            .collect())
    }

    async fn capture(&self, ctx: &UpdateContext<'_>, limit: Option<usize>) -> Result<UpdateCapture> {
        let mut capture = UpdateCapture::new(OperationId::new());
        let found = self.store.find(ctx.collection, ctx.filter).await?;
        for doc in found.iter().take(limit.unwrap_or(usize::MAX)) {
            capture.push(doc);
        }
        tracing::debug!(
            operation_id = %capture.operation_id(),
            docs_len = capture.len() as u64,
            "captured documents before update"
        );
        Ok(capture)
    }

    async fn record_update(
        &self,
        ctx: &UpdateContext<'_>,
        result: &UpdateResult,
        capture: UpdateCapture,
        limit: Option<usize>,
    ) -> Result<Vec<PatchRecord>> {
        if result.is_noop() {
            return Ok(Vec::new());
        }
        let targets = self.resolve_updated(ctx, result, &capture, limit).await?;
        let patches = try_join_all(
            targets
                .iter()
                .map(|(doc, snapshot)| self.create_patch(doc, snapshot, &ctx.options.metadata)),
        )
        .await?;
        Ok(patches.into_iter().flatten().collect())
    }
}

fn resolve_include(
    name: &str,
    field: &IncludeField,
    doc: &Document,
    metadata: &Map<String, Value>,
) -> Option<Value> {
    let source = field.source_name(name);
    let value = doc
        .resolve(source)
        .filter(|v| !v.is_null())
        .or_else(|| metadata.get(source).cloned())?;
    if field.kind.accepts(&value) {
        Some(value)
    } else {
        tracing::warn!(
            include = name,
            expected = field.kind.as_str(),
            "dropping include value of the wrong type"
        );
        None
    }
}

/// Conditions plus direct assignments, used to find an upserted document.
fn merged_conditions(filter: &Filter, update: &Update) -> Filter {
    let mut merged = filter.equalities();
    for (field, value) in update.assignments() {
        if !field.contains('$') {
            merged.insert(field.clone(), value.clone());
        }
    }
    Filter::from_map(merged)
}

#[async_trait]
impl LifecycleHooks for PatchHistory {
    async fn on_before_save(
        &self,
        doc: &Document,
        original: Option<&Value>,
    ) -> Result<Option<PatchRecord>> {
        let empty = Value::Object(Map::new());
        self.create_patch(doc, original.unwrap_or(&empty), &Map::new())
            .await
    }

    async fn on_before_delete(&self, doc: &Document) -> Result<u64> {
        if !self.options.remove_patches {
            return Ok(0);
        }
        self.delete_patches(&doc.id).await
    }

    async fn on_before_find_and_delete(&self, collection: &str, filter: &Filter) -> Result<u64> {
        if !self.options.remove_patches {
            return Ok(0);
        }
        match self.store.find_one(collection, filter).await? {
            Some(doc) => self.delete_patches(&doc.id).await,
            None => Ok(0),
        }
    }

    async fn on_before_update_one(&self, ctx: &UpdateContext<'_>) -> Result<UpdateCapture> {
        self.capture(ctx, Some(1)).await
    }

    async fn on_after_update_one(
        &self,
        ctx: &UpdateContext<'_>,
        result: &UpdateResult,
        capture: UpdateCapture,
    ) -> Result<Vec<PatchRecord>> {
        self.record_update(ctx, result, capture, Some(1)).await
    }

    async fn on_before_update_many(&self, ctx: &UpdateContext<'_>) -> Result<UpdateCapture> {
        self.capture(ctx, None).await
    }

    async fn on_after_update_many(
        &self,
        ctx: &UpdateContext<'_>,
        result: &UpdateResult,
        capture: UpdateCapture,
    ) -> Result<Vec<PatchRecord>> {
        self.record_update(ctx, result, capture, None).await
    }
}

/// Configures a [`PatchHistory`]. Validation happens in [`build`](Self::build).
pub struct PatchHistoryBuilder {
    tracked_collection: String,
    store: Option<Arc<dyn DocumentStore>>,
    options: PatchHistoryOptions,
}

impl PatchHistoryBuilder {
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Base name of the patch collection.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = name.into();
        self
    }

    pub fn include(mut self, name: impl Into<String>, field: IncludeField) -> Self {
        self.options.includes.insert(name.into(), field);
        self
    }

    pub fn exclude(mut self, path: impl Into<String>) -> Self {
        self.options.excludes.push(path.into());
        self
    }

    pub fn remove_patches(mut self, remove: bool) -> Self {
        self.options.remove_patches = remove;
        self
    }

    pub fn transforms(mut self, transforms: Transforms) -> Self {
        self.options.transforms = transforms;
        self
    }

    pub fn track_original_value(mut self, track: bool) -> Self {
        self.options.track_original_value = track;
        self
    }

    /// Replace all options at once.
    pub fn options(mut self, options: PatchHistoryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<PatchHistory> {
        let store = self.store.ok_or(PatchLogError::MissingStore)?;
        let options = self.options.validate()?;
        if options.collection_name == self.tracked_collection {
            return Err(PatchLogError::CollectionConflict {
                collection: options.collection_name,
            }
            .into());
        }

        tracing::debug!(
            collection = %self.tracked_collection,
            patch_collection = %options.collection_name,
            "patch history configured"
        );
        Ok(PatchHistory {
            store,
            tracked_collection: self.tracked_collection,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchlog_core::ValueKind;
    use patchlog_store::MemoryStore;
    use serde_json::json;

    fn store() -> Arc<dyn DocumentStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_build_requires_store_and_name() {
        let err = PatchHistory::builder("posts").name("postPatches").build().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidConfig);
        assert!(err.message().contains("`store`"));

        let err = PatchHistory::builder("posts").store(store()).build().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidConfig);
        assert!(err.message().contains("`name`"));
    }

    #[test]
    fn test_build_rejects_collection_conflict() {
        let err = PatchHistory::builder("post_patches")
            .store(store())
            .name("postPatches")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidConfig);
    }

    #[test]
    fn test_names_are_derived() {
        let history = PatchHistory::builder("posts")
            .store(store())
            .name("postPatches")
            .build()
            .unwrap();
        assert_eq!(history.patch_collection(), "post_patches");
        assert_eq!(history.model_name(), "PostPatches");
    }

    #[test]
    fn test_include_resolution() {
        let mut doc = Document::new(DocumentId::from("d"));
        doc.set("user", json!("from-doc"));
        let mut metadata = Map::new();
        metadata.insert("user".to_string(), json!("from-meta"));
        metadata.insert("reason".to_string(), json!(42));

        let user = IncludeField::new(ValueKind::String);
        assert_eq!(
            resolve_include("user", &user, &doc, &metadata),
            Some(json!("from-doc"))
        );

        let reason = IncludeField::new(ValueKind::String);
        assert_eq!(resolve_include("reason", &reason, &doc, &metadata), None);

        let version = IncludeField::new(ValueKind::Number).from("__v");
        assert_eq!(resolve_include("version", &version, &doc, &metadata), Some(json!(0)));
    }

    #[test]
    fn test_merged_conditions_drop_operators() {
        let filter = Filter::all()
            .eq("title", json!("foo"))
            .any_of("n", vec![json!(1)]);
        let update = Update::from_value(json!({ "$set": { "active": true }, "$inc": { "n": 1 } }))
            .unwrap();
        assert_eq!(
            merged_conditions(&filter, &update).conditions(),
            json!({ "title": "foo", "active": true }).as_object().unwrap()
        );
    }
}
