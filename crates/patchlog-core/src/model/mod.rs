//! Document and patch record model.

pub mod document;
pub mod patch_record;

pub use document::{Document, DocumentId};
pub use patch_record::{PatchRecord, RESERVED_PATCH_FIELDS};
