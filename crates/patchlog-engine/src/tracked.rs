//! Documents handed out by a tracked collection.

use std::time::Instant;

use patchlog_core::rollback::plan_rollback;
use patchlog_core::{log_op_end, log_op_error, log_op_start, Document, DocumentId, Result};
use serde_json::{Map, Value};

use crate::collection::TrackedCollection;
use crate::patches::PatchQuery;

/// A document plus the snapshot its next diff is computed against.
#[derive(Debug, Clone)]
pub struct TrackedDocument {
    doc: Document,
    /// `None` until the document has been saved or loaded
    original: Option<Value>,
    collection: TrackedCollection,
}

impl TrackedDocument {
    pub(crate) fn new(doc: Document, collection: TrackedCollection) -> Self {
        Self {
            doc,
            original: None,
            collection,
        }
    }

    pub(crate) fn loaded(doc: Document, snapshot: Value, collection: TrackedCollection) -> Self {
        Self {
            doc,
            original: Some(snapshot),
            collection,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.doc.id
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    /// Comparison-safe view of the current data.
    pub fn data(&self) -> Value {
        self.doc.data()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.doc.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.doc.set(key, value);
    }

    pub fn unset(&mut self, key: &str) -> Option<Value> {
        self.doc.unset(key)
    }

    /// Transient value, visible to included fields but never stored.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.doc.set_attribute(key, value);
    }

    /// True until the document has been saved.
    pub fn is_new(&self) -> bool {
        self.original.is_none()
    }

    pub fn original(&self) -> Option<&Value> {
        self.original.as_ref()
    }

    pub(crate) fn refresh_snapshot(&mut self, snapshot: Value) {
        self.original = Some(snapshot);
    }

    /// Data differs from the snapshot (always true for a new document).
    pub fn is_modified(&self) -> bool {
        self.original.as_ref() != Some(&self.doc.data())
    }

    /// This document's patches.
    pub fn patches(&self) -> PatchQuery {
        self.collection.history().patches_for(&self.doc.id)
    }

    /// Restore the state recorded by `patch_id`, with `overrides` merged on
    /// top. Values at excluded paths are kept from the current document.
    /// With `persist` the restored state is saved, which records one more
    /// patch; otherwise only this in-memory copy changes.
    pub async fn rollback(
        &mut self,
        patch_id: &DocumentId,
        overrides: Map<String, Value>,
        persist: bool,
    ) -> Result<()> {
        log_op_start!("rollback", doc_id = %self.doc.id, patch_id = %patch_id);
        let start = Instant::now();

        self.rollback_impl(patch_id, &overrides, persist)
            .await
            .map_err(|e| {
                log_op_error!(
                    "rollback",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    patch_id = %patch_id
                );
                e
            })?;

        log_op_end!(
            "rollback",
            duration_ms = start.elapsed().as_millis() as u64,
            doc_id = %self.doc.id,
            patch_id = %patch_id
        );
        Ok(())
    }

    async fn rollback_impl(
        &mut self,
        patch_id: &DocumentId,
        overrides: &Map<String, Value>,
        persist: bool,
    ) -> Result<()> {
        let patches = self.patches().all().await?;
        let exclusions = &self.collection.history().options().exclusions;
        let state = plan_rollback(&patches, patch_id, &self.doc.fields, exclusions, overrides)?;
        self.doc.replace_fields(state);

        if persist {
            let collection = self.collection.clone();
            collection.save(self).await?;
        }
        Ok(())
    }
}
