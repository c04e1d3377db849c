//! The document store boundary.

use async_trait::async_trait;
use patchlog_core::Document;

use crate::errors::Result;
use crate::query::{Filter, Update, UpdateOptions, UpdateResult};

/// Create/find/update/delete over named collections.
///
/// Reads return documents in insertion order. Stored documents never carry
/// transient attributes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    /// Insert a new document. Fails if the identifier is taken.
    async fn insert(&self, collection: &str, doc: &Document) -> Result<()>;

    /// Overwrite the document with the same identifier. Returns false when
    /// there was none.
    async fn replace(&self, collection: &str, doc: &Document) -> Result<bool>;

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        options: &UpdateOptions,
    ) -> Result<UpdateResult>;

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        options: &UpdateOptions,
    ) -> Result<UpdateResult>;

    /// Delete the first match. Returns the number deleted.
    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64>;

    async fn collection_names(&self) -> Result<Vec<String>>;
}

/// Copy of `doc` as it is persisted.
pub(crate) fn stored(doc: &Document) -> Document {
    let mut stored = doc.clone();
    stored.attributes.clear();
    stored
}
