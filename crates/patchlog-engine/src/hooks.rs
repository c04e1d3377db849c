//! Lifecycle hook points of a tracked collection.
//!
//! The model layer calls these around every mutation. State that has to
//! survive from a before-hook to its after-hook travels in an
//! [`UpdateCapture`] owned by the caller, never on the document or query.

use async_trait::async_trait;
use patchlog_core::core_types::OperationId;
use patchlog_core::{Document, DocumentId, PatchRecord, Result};
use patchlog_store::{Filter, Update, UpdateOptions, UpdateResult};
use serde_json::Value;

/// What an update hook gets to see.
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext<'a> {
    pub collection: &'a str,
    pub filter: &'a Filter,
    pub update: &'a Update,
    pub options: &'a UpdateOptions,
}

/// Documents captured before an update ran, paired with their snapshots.
#[derive(Debug, Clone, Default)]
pub struct UpdateCapture {
    operation_id: OperationId,
    captured: Vec<(DocumentId, Value)>,
}

impl UpdateCapture {
    pub fn new(operation_id: OperationId) -> Self {
        Self {
            operation_id,
            captured: Vec::new(),
        }
    }

    pub fn push(&mut self, doc: &Document) {
        self.captured.push((doc.id.clone(), doc.data()));
    }

    pub fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    pub fn captured(&self) -> &[(DocumentId, Value)] {
        &self.captured
    }

    pub fn ids(&self) -> impl Iterator<Item = &DocumentId> {
        self.captured.iter().map(|(id, _)| id)
    }

    pub fn snapshot_for(&self, id: &DocumentId) -> Option<&Value> {
        self.captured
            .iter()
            .find(|(captured, _)| captured == id)
            .map(|(_, snapshot)| snapshot)
    }

    pub fn is_empty(&self) -> bool {
        self.captured.is_empty()
    }

    pub fn len(&self) -> usize {
        self.captured.len()
    }
}

/// Hook points a document store model drives.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// Snapshot to keep after a document was loaded.
    fn on_after_load(&self, doc: &Document) -> Value {
        doc.data()
    }

    /// Runs before a document is written. `original` is `None` for a new
    /// document. Returns the patch recorded, if anything changed.
    async fn on_before_save(
        &self,
        doc: &Document,
        original: Option<&Value>,
    ) -> Result<Option<PatchRecord>>;

    /// Snapshot to keep after a document was written.
    fn on_after_save(&self, doc: &Document) -> Value {
        doc.data()
    }

    /// Runs before a loaded document is deleted. Returns patches removed.
    async fn on_before_delete(&self, doc: &Document) -> Result<u64>;

    /// Runs before a query-based delete. Returns patches removed.
    async fn on_before_find_and_delete(&self, collection: &str, filter: &Filter) -> Result<u64>;

    async fn on_before_update_one(&self, ctx: &UpdateContext<'_>) -> Result<UpdateCapture>;

    async fn on_after_update_one(
        &self,
        ctx: &UpdateContext<'_>,
        result: &UpdateResult,
        capture: UpdateCapture,
    ) -> Result<Vec<PatchRecord>>;

    async fn on_before_update_many(&self, ctx: &UpdateContext<'_>) -> Result<UpdateCapture>;

    async fn on_after_update_many(
        &self,
        ctx: &UpdateContext<'_>,
        result: &UpdateResult,
        capture: UpdateCapture,
    ) -> Result<Vec<PatchRecord>>;
}
