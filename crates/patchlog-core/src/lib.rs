//! Patchlog Core - synchronous patch history kernel
//!
//! This crate holds everything that does not touch a store:
//! - JSON Patch compare/apply over `serde_json` values
//! - Exclusion paths that drop or redact diff operations
//! - Document and patch record model
//! - Plugin options and the default naming transforms
//! - Change detection and rollback reconstruction
//! - Error and logging facilities shared by the workspace

pub mod config;
pub mod diff;
pub mod errors;
pub mod exclusion;
pub mod json_patch;
pub mod logging_facility;
pub mod model;
pub mod rollback;

pub use patchlog_core_types as core_types;

// Re-export commonly used types
pub use config::{IncludeField, PatchHistoryOptions, Transforms, ValidatedOptions, ValueKind};
pub use diff::detect_changes;
pub use errors::{ExError, ExErrorKind, PatchLogError, Result};
pub use exclusion::{ExclusionFilter, ExclusionPath, Verdict};
pub use json_patch::{OpKind, Operation};
pub use model::{Document, DocumentId, PatchRecord};
