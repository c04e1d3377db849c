//! SQLite document store.
//!
//! One `documents` table holds every collection. Bodies are JSON; the
//! identifier column holds the JSON encoding of the id so `1` and `"1"`
//! stay distinct.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use patchlog_core::{Document, DocumentId};
use rusqlite::{params, Connection, Transaction};
use tokio::sync::Mutex;

use crate::db;
use crate::errors::{duplicate_id, from_rusqlite, from_serde, Result};
use crate::migrations::apply_migrations;
use crate::query::{apply_update, upsert_document, Filter, Update, UpdateOptions, UpdateResult};
use crate::store::{stored, DocumentStore};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and bring its schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = db::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = db::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
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
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(from_rusqlite)?;

        let mut result = UpdateResult::default();
        let matching = load(&tx, collection)?
            .into_iter()
            .filter(|(_, doc)| filter.matches(doc))
            .take(limit.unwrap_or(usize::MAX));
        for (seq, mut doc) in matching {
            let modified = apply_update(&mut doc, update, options, now)?;
            tx.execute(
                "UPDATE documents SET body = ?1 WHERE seq = ?2",
                params![encode_body(&doc)?, seq],
            )
            .map_err(from_rusqlite)?;
            result.matched += 1;
            if modified {
                result.modified += 1;
            }
        }

        if result.matched == 0 && options.upsert {
            let doc = upsert_document(filter, update, options, now)?;
            insert_row(&tx, collection, &doc)?;
            result.upserted_id = Some(doc.id);
        }

        tx.commit().map_err(from_rusqlite)?;
        Ok(result)
    }

    async fn delete(&self, collection: &str, filter: &Filter, limit: Option<usize>) -> Result<u64> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(from_rusqlite)?;

        let seqs: Vec<i64> = load(&tx, collection)?
            .into_iter()
            .filter(|(_, doc)| filter.matches(doc))
            .take(limit.unwrap_or(usize::MAX))
            .map(|(seq, _)| seq)
            .collect();
        for seq in &seqs {
            tx.execute("DELETE FROM documents WHERE seq = ?1", params![seq])
                .map_err(from_rusqlite)?;
        }

        tx.commit().map_err(from_rusqlite)?;
        Ok(seqs.len() as u64)
    }
}

fn encode_id(id: &DocumentId) -> Result<String> {
    serde_json::to_string(id).map_err(|e| from_serde("encode_id", e))
}

fn encode_body(doc: &Document) -> Result<String> {
    serde_json::to_string(doc).map_err(|e| from_serde("encode_document", e))
}

fn decode_body(body: &str) -> Result<Document> {
    serde_json::from_str(body).map_err(|e| from_serde("decode_document", e))
}

fn load(conn: &Connection, collection: &str) -> Result<Vec<(i64, Document)>> {
    let mut stmt = conn
        .prepare("SELECT seq, body FROM documents WHERE collection = ?1 ORDER BY seq")
        .map_err(from_rusqlite)?;
    let rows: Vec<(i64, String)> = stmt
        .query_map([collection], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    rows.into_iter()
        .map(|(seq, body)| Ok((seq, decode_body(&body)?)))
        .collect()
}

fn insert_row(tx: &Transaction<'_>, collection: &str, doc: &Document) -> Result<()> {
    let id = encode_id(&doc.id)?;
    let taken: bool = tx
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE collection = ?1 AND id = ?2)",
            params![collection, id],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)?;
    if taken {
        return Err(duplicate_id(collection, &doc.id.to_string()));
    }
    tx.execute(
        "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
        params![collection, id, encode_body(&stored(doc))?],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let conn = self.conn.lock().await;
        Ok(load(&conn, collection)?
            .into_iter()
            .map(|(_, doc)| doc)
            .filter(|doc| filter.matches(doc))
            .collect())
    }

    async fn insert(&self, collection: &str, doc: &Document) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(from_rusqlite)?;
        insert_row(&tx, collection, doc)?;
        tx.commit().map_err(from_rusqlite)
    }

    async fn replace(&self, collection: &str, doc: &Document) -> Result<bool> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE documents SET body = ?1 WHERE collection = ?2 AND id = ?3",
                params![encode_body(&stored(doc))?, collection, encode_id(&doc.id)?],
            )
            .map_err(from_rusqlite)?;
        Ok(changed > 0)
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
        self.delete(collection, filter, Some(1)).await
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64> {
        self.delete(collection, filter, None).await
    }

    async fn collection_names(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT DISTINCT collection FROM documents ORDER BY collection")
            .map_err(from_rusqlite)?;
        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(from_rusqlite)?;
        Ok(names)
    }
}
