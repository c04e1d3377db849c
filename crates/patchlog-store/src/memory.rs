//! In-memory document store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use patchlog_core::Document;
use tokio::sync::RwLock;

use crate::errors::{duplicate_id, Result};
use crate::query::{apply_update, upsert_document, Filter, Update, UpdateOptions, UpdateResult};
use crate::store::{stored, DocumentStore};

/// Collections held in insertion order behind one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        options: &UpdateOptions,
        limit: Option<usize>,
    ) -> Result<UpdateResult> {
        let now = Utc::now();
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        // Stage every change first so a failing update leaves the whole
        // collection untouched
        let mut staged = Vec::new();
        for (idx, doc) in docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| filter.matches(doc))
            .take(limit.unwrap_or(usize::MAX))
        {
            let mut next = doc.clone();
            let modified = apply_update(&mut next, update, options, now)?;
            staged.push((idx, next, modified));
        }

        let mut result = UpdateResult::default();
        for (idx, next, modified) in staged {
            docs[idx] = next;
            result.matched += 1;
            if modified {
                result.modified += 1;
            }
        }

        if result.matched == 0 && options.upsert {
            let doc = upsert_document(filter, update, options, now)?;
            if docs.iter().any(|existing| existing.id == doc.id) {
                return Err(duplicate_id(collection, &doc.id.to_string()));
            }
            result.upserted_id = Some(doc.id.clone());
            docs.push(doc);
        }
        Ok(result)
    }

    async fn delete(&self, collection: &str, filter: &Filter, limit: Option<usize>) -> u64 {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return 0;
        };
        let mut remaining = limit.unwrap_or(usize::MAX);
        let before = docs.len();
        docs.retain(|doc| {
            if remaining > 0 && filter.matches(doc) {
                remaining -= 1;
                false
            } else {
                true
            }
        });
        (before - docs.len()) as u64
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, doc: &Document) -> Result<()> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|existing| existing.id == doc.id) {
            return Err(duplicate_id(collection, &doc.id.to_string()));
        }
        docs.push(stored(doc));
        Ok(())
    }

    async fn replace(&self, collection: &str, doc: &Document) -> Result<bool> {
        let mut collections = self.collections.write().await;
        let slot = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|existing| existing.id == doc.id));
        match slot {
            Some(slot) => {
                *slot = stored(doc);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        options: &UpdateOptions,
    ) -> Result<UpdateResult> {
        self.update(collection, filter, update, options, Some(1)).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        options: &UpdateOptions,
    ) -> Result<UpdateResult> {
        self.update(collection, filter, update, options, None).await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64> {
        Ok(self.delete(collection, filter, Some(1)).await)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64> {
        Ok(self.delete(collection, filter, None).await)
    }

    async fn collection_names(&self) -> Result<Vec<String>> {
        let collections = self.collections.read().await;
        Ok(collections.keys().cloned().collect())
    }
}
