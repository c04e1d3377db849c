//! Query handle over a patch collection.

use std::sync::Arc;

use patchlog_core::rollback::order_patches;
use patchlog_core::{DocumentId, PatchRecord, Result};
use patchlog_store::{DocumentStore, Filter};
use serde_json::Value;

/// Patches of a collection, optionally narrowed. Results come back ordered
/// by date, oldest first, with insertion order breaking ties.
#[derive(Clone)]
pub struct PatchQuery {
    store: Arc<dyn DocumentStore>,
    collection: String,
    filter: Filter,
}

impl std::fmt::Debug for PatchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchQuery")
            .field("collection", &self.collection)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl PatchQuery {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            filter: Filter::all(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Narrow to one document's patches.
    pub fn for_document(self, id: &DocumentId) -> Self {
        self.where_eq("ref", id.to_value())
    }

    /// Narrow by any stored field, included fields among them.
    pub fn where_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filter = self.filter.eq(field, value);
        self
    }

    pub async fn all(&self) -> Result<Vec<PatchRecord>> {
        let docs = self.store.find(&self.collection, &self.filter).await?;
        let mut patches = docs
            .iter()
            .map(PatchRecord::from_document)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        order_patches(&mut patches);
        Ok(patches)
    }

    /// Oldest matching patch.
    pub async fn find_one(&self) -> Result<Option<PatchRecord>> {
        Ok(self.all().await?.into_iter().next())
    }

    /// Newest matching patch.
    pub async fn latest(&self) -> Result<Option<PatchRecord>> {
        Ok(self.all().await?.pop())
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.store.find(&self.collection, &self.filter).await?.len())
    }
}
