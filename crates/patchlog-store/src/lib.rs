//! Patchlog Store - the document store boundary
//!
//! Provides:
//! - The async `DocumentStore` trait the patch history engine talks to
//! - Filter and update documents with a small operator set
//! - An in-memory store and a SQLite store with embedded migrations

pub mod db;
pub mod errors;
pub mod memory;
pub mod migrations;
pub mod query;
pub mod sqlite;
pub mod store;

// Re-export key types
pub use errors::Result;
pub use memory::MemoryStore;
pub use query::{Filter, Update, UpdateOptions, UpdateResult};
pub use sqlite::SqliteStore;
pub use store::DocumentStore;
