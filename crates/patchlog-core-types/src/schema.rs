//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_OPERATION_ID: &str = "operation_id";

// Entity identifiers
pub const FIELD_DOC_ID: &str = "doc_id";
pub const FIELD_PATCH_ID: &str = "patch_id";
pub const FIELD_COLLECTION: &str = "collection";

// Collection sizes
pub const FIELD_OPS_LEN: &str = "ops_len";
pub const FIELD_DOCS_LEN: &str = "docs_len";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
