//! Model layer over a store collection.
//!
//! Applies schema defaults and timestamps, then drives the lifecycle hooks
//! around each mutation:
//!
//! | Call | Hooks |
//! |---|---|
//! | `find*` | after load |
//! | `save` / `create` | before save, after save |
//! | `update_one` / `find_one_and_update` | before/after update one |
//! | `update_many` | before/after update many |
//! | `delete` | before delete |
//! | `find_one_and_delete` | before find-and-delete |

use std::sync::Arc;

use chrono::Utc;
use patchlog_core::errors::{ExError, ExErrorKind, PatchLogError};
use patchlog_core::{Document, DocumentId, Result};
use patchlog_store::{DocumentStore, Filter, Update, UpdateOptions, UpdateResult};
use serde_json::{Map, Value};

use crate::history::PatchHistory;
use crate::hooks::{LifecycleHooks, UpdateContext};
use crate::patches::PatchQuery;
use crate::tracked::TrackedDocument;

/// Schema-level settings of a tracked collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSpec {
    pub collection: String,
    /// Values filled in for fields a new document does not set
    pub defaults: Map<String, Value>,
    /// Maintain `created_at` / `updated_at`
    pub timestamps: bool,
}

impl ModelSpec {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    pub fn with_default(mut self, field: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(field.into(), value);
        self
    }

    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }
}

/// Which version of the document `find_one_and_update` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnDocument {
    #[default]
    Before,
    After,
}

/// A collection whose documents have patch history.
#[derive(Clone)]
pub struct TrackedCollection {
    spec: Arc<ModelSpec>,
    history: Arc<PatchHistory>,
}

impl std::fmt::Debug for TrackedCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedCollection")
            .field("collection", &self.spec.collection)
            .finish_non_exhaustive()
    }
}

impl TrackedCollection {
    /// `history` must have been built for `spec.collection`.
    pub fn new(spec: ModelSpec, history: Arc<PatchHistory>) -> Result<Self> {
        if history.tracked_collection() != spec.collection {
            return Err(ExError::new(ExErrorKind::InvalidConfig)
                .with_op("configure")
                .with_entity_id(spec.collection.clone())
                .with_message(format!(
                    "patch history was configured for `{}`",
                    history.tracked_collection()
                )));
        }
        Ok(Self {
            spec: Arc::new(spec),
            history,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.collection
    }

    pub fn history(&self) -> &Arc<PatchHistory> {
        &self.history
    }

    /// Every patch of this collection.
    pub fn patches(&self) -> PatchQuery {
        self.history.patches()
    }

    fn store(&self) -> &Arc<dyn DocumentStore> {
        self.history.store()
    }

    /// Unsaved document with defaults applied.
    pub fn new_document(&self, fields: Map<String, Value>) -> TrackedDocument {
        self.new_document_with_id(DocumentId::generate(), fields)
    }

    pub fn new_document_with_id(&self, id: DocumentId, fields: Map<String, Value>) -> TrackedDocument {
        let mut doc = Document::with_fields(id, fields);
        for (field, value) in &self.spec.defaults {
            if !doc.fields.contains_key(field) {
                doc.set(field.clone(), value.clone());
            }
        }
        TrackedDocument::new(doc, self.clone())
    }

    /// Create and save in one step.
    pub async fn create(&self, fields: Map<String, Value>) -> Result<TrackedDocument> {
        let mut doc = self.new_document(fields);
        self.save(&mut doc).await?;
        Ok(doc)
    }

    /// Persist `doc`, recording a patch first when its data changed.
    pub async fn save(&self, doc: &mut TrackedDocument) -> Result<()> {
        let is_new = doc.is_new();
        if self.spec.timestamps && doc.is_modified() {
            let now = Utc::now();
            let inner = doc.document_mut();
            if is_new {
                inner.created_at = Some(now);
            }
            inner.updated_at = Some(now);
        }

        // A failed patch aborts the save
        self.history
            .on_before_save(doc.document(), doc.original())
            .await?;

        if is_new {
            self.store().insert(self.name(), doc.document()).await?;
        } else if !self.store().replace(self.name(), doc.document()).await? {
            return Err(PatchLogError::DocumentNotFound {
                collection: self.name().to_string(),
                doc_id: doc.id().to_string(),
            }
            .into());
        }

        let snapshot = self.history.on_after_save(doc.document());
        doc.refresh_snapshot(snapshot);
        Ok(())
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<TrackedDocument>> {
        let docs = self.store().find(self.name(), filter).await?;
        Ok(docs.into_iter().map(|doc| self.loaded(doc)).collect())
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<TrackedDocument>> {
        let doc = self.store().find_one(self.name(), filter).await?;
        Ok(doc.map(|doc| self.loaded(doc)))
    }

    pub async fn find_by_id(&self, id: &DocumentId) -> Result<Option<TrackedDocument>> {
        self.find_one(&Filter::by_id(id)).await
    }

    fn loaded(&self, doc: Document) -> TrackedDocument {
        let snapshot = self.history.on_after_load(&doc);
        TrackedDocument::loaded(doc, snapshot, self.clone())
    }

    fn update_options(&self, mut options: UpdateOptions) -> UpdateOptions {
        options.timestamps = options.timestamps || self.spec.timestamps;
        for (field, value) in &self.spec.defaults {
            options
                .defaults
                .entry(field.clone())
                .or_insert_with(|| value.clone());
        }
        options
    }

    pub async fn update_one(
        &self,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        let options = self.update_options(options);
        let ctx = UpdateContext {
            collection: self.name(),
            filter,
            update,
            options: &options,
        };

        let capture = self.history.on_before_update_one(&ctx).await?;
        let result = self
            .store()
            .update_one(self.name(), filter, update, &options)
            .await?;
        self.history
            .on_after_update_one(&ctx, &result, capture)
            .await?;
        Ok(result)
    }

    pub async fn update_many(
        &self,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        let options = self.update_options(options);
        let ctx = UpdateContext {
            collection: self.name(),
            filter,
            update,
            options: &options,
        };

        let capture = self.history.on_before_update_many(&ctx).await?;
        let result = self
            .store()
            .update_many(self.name(), filter, update, &options)
            .await?;
        self.history
            .on_after_update_many(&ctx, &result, capture)
            .await?;
        Ok(result)
    }

    /// Update the first match and return it as it was before or after.
    pub async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
        returning: ReturnDocument,
    ) -> Result<Option<TrackedDocument>> {
        let before = self.store().find_one(self.name(), filter).await?;
        let target = match &before {
            // Pin the update to the document just read
            Some(doc) => Filter::by_id(&doc.id),
            None if options.upsert => filter.clone(),
            None => return Ok(None),
        };

        let result = self.update_one(&target, update, options).await?;

        match returning {
            ReturnDocument::Before => Ok(before.map(|doc| self.loaded(doc))),
            ReturnDocument::After => {
                let id = before.map(|doc| doc.id).or(result.upserted_id);
                match id {
                    Some(id) => self.find_by_id(&id).await,
                    None => Ok(None),
                }
            }
        }
    }

    /// Delete a loaded document, removing its patches first.
    pub async fn delete(&self, doc: &TrackedDocument) -> Result<u64> {
        self.history.on_before_delete(doc.document()).await?;
        Ok(self
            .store()
            .delete_one(self.name(), &Filter::by_id(doc.id()))
            .await?)
    }

    /// Delete the first match, removing its patches first.
    pub async fn find_one_and_delete(&self, filter: &Filter) -> Result<Option<TrackedDocument>> {
        self.history
            .on_before_find_and_delete(self.name(), filter)
            .await?;
        let Some(doc) = self.store().find_one(self.name(), filter).await? else {
            return Ok(None);
        };
        self.store()
            .delete_one(self.name(), &Filter::by_id(&doc.id))
            .await?;
        Ok(Some(self.loaded(doc)))
    }
}
