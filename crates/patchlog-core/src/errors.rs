use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every error that crosses a crate boundary carries one of these kinds.
/// Each kind maps to a stable code usable for programmatic handling and
/// test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Setup
    /// Plugin options are incomplete or contradictory (fails at build time)
    InvalidConfig,

    // Rollback
    /// Unknown target patch, or the target patch is already the current state
    Rollback,

    // Structural/Validation
    InvalidInput,
    NotFound,
    /// A patch operation could not be applied to the reconstruction state
    InvalidPatch,

    // Integration/IO
    Io,
    Serialization,
    Persistence,
    Concurrency,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Rollback => "ERR_ROLLBACK",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::InvalidPatch => "ERR_INVALID_PATCH",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus enough context
/// (operation, entity, message) to debug a failed hook.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// True for the two rollback failure cases (unknown patch, latest patch)
    pub fn is_rollback(&self) -> bool {
        self.kind == ExErrorKind::Rollback
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for patch history operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchLogError {
    // ===== Configuration Errors =====
    /// No document store handle was supplied
    #[error("`store` option must be defined")]
    MissingStore,

    /// No (or an empty) patch collection base name was supplied
    #[error("`name` option must be defined")]
    MissingName,

    /// An include field would shadow one of the patch record's own fields
    #[error("include field `{name}` conflicts with a reserved patch field")]
    ReservedIncludeName { name: String },

    /// An exclusion path could not be parsed
    #[error("invalid exclusion path `{path}`: {reason}")]
    InvalidExclusionPath { path: String, reason: String },

    /// The patch collection resolved to the tracked collection itself
    #[error("patch collection `{collection}` conflicts with the tracked collection")]
    CollectionConflict { collection: String },

    // ===== Rollback Errors =====
    /// The requested rollback target is not among the document's patches
    #[error("patch doesn't exist")]
    PatchNotFound { patch_id: String },

    /// The requested rollback target is the newest patch
    #[error("rollback to latest patch")]
    RollbackToLatest { patch_id: String },

    // ===== Document Errors =====
    /// A document could not be located in its collection
    #[error("document not found in `{collection}`: {doc_id}")]
    DocumentNotFound { collection: String, doc_id: String },

    /// A patch operation failed to apply during reconstruction
    #[error("cannot apply operation at `{path}`: {reason}")]
    PatchApply { path: String, reason: String },

    /// A stored patch record does not have the expected shape
    #[error("malformed patch record: {reason}")]
    MalformedPatchRecord { reason: String },
}

impl From<PatchLogError> for ExError {
    fn from(err: PatchLogError) -> Self {
        let message = err.to_string();
        match err {
            PatchLogError::MissingStore | PatchLogError::MissingName => {
                ExError::new(ExErrorKind::InvalidConfig)
                    .with_op("configure")
                    .with_message(message)
            }
            PatchLogError::ReservedIncludeName { name } => {
                ExError::new(ExErrorKind::InvalidConfig)
                    .with_op("configure")
                    .with_entity_id(name)
                    .with_message(message)
            }
            PatchLogError::InvalidExclusionPath { path, .. } => {
                ExError::new(ExErrorKind::InvalidConfig)
                    .with_op("configure")
                    .with_entity_id(path)
                    .with_message(message)
            }
            PatchLogError::CollectionConflict { collection } => {
                ExError::new(ExErrorKind::InvalidConfig)
                    .with_op("configure")
                    .with_entity_id(collection)
                    .with_message(message)
            }
            PatchLogError::PatchNotFound { patch_id }
            | PatchLogError::RollbackToLatest { patch_id } => ExError::new(ExErrorKind::Rollback)
                .with_op("rollback")
                .with_entity_id(patch_id)
                .with_message(message),
            PatchLogError::DocumentNotFound { doc_id, .. } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(doc_id)
                .with_message(message),
            PatchLogError::PatchApply { path, .. } => ExError::new(ExErrorKind::InvalidPatch)
                .with_op("apply_patch")
                .with_entity_id(path)
                .with_message(message),
            PatchLogError::MalformedPatchRecord { .. } => {
                ExError::new(ExErrorKind::Serialization)
                    .with_op("decode_patch")
                    .with_message(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_errors_share_kind() {
        let unknown: ExError = PatchLogError::PatchNotFound {
            patch_id: "p1".to_string(),
        }
        .into();
        let latest: ExError = PatchLogError::RollbackToLatest {
            patch_id: "p2".to_string(),
        }
        .into();

        assert!(unknown.is_rollback());
        assert!(latest.is_rollback());
        assert_eq!(unknown.message(), "patch doesn't exist");
        assert_eq!(latest.message(), "rollback to latest patch");
        assert_eq!(unknown.entity_id(), Some("p1"));
    }

    #[test]
    fn test_config_errors_are_invalid_config() {
        for err in [
            PatchLogError::MissingStore,
            PatchLogError::MissingName,
            PatchLogError::ReservedIncludeName {
                name: "ops".to_string(),
            },
        ] {
            let ex: ExError = err.into();
            assert_eq!(ex.kind(), ExErrorKind::InvalidConfig);
            assert_eq!(ex.code(), "ERR_INVALID_CONFIG");
            assert!(!ex.is_rollback());
        }
    }

    #[test]
    fn test_display_includes_code_and_context() {
        let err = ExError::new(ExErrorKind::Persistence)
            .with_op("insert")
            .with_message("disk full")
            .with_entity_id("doc-1");
        let rendered = err.to_string();
        assert!(rendered.starts_with("[ERR_PERSISTENCE]"));
        assert!(rendered.contains("'insert'"));
        assert!(rendered.contains("disk full"));
        assert!(rendered.contains("doc-1"));
    }

    #[test]
    fn test_source_chain_is_exposed() {
        use std::error::Error as _;

        let inner = ExError::new(ExErrorKind::Io).with_message("broken pipe");
        let outer = ExError::new(ExErrorKind::Persistence).with_source(inner);
        assert_eq!(
            outer.source_error().map(|e| e.kind()),
            Some(ExErrorKind::Io)
        );
        assert!(outer.source().is_some());
    }
}
