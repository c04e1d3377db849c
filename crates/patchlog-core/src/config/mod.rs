//! Plugin configuration.

pub mod naming;
pub mod options;

pub use naming::{camelize, decamelize, pascalize};
pub use options::{
    IncludeField, NameTransform, PatchHistoryOptions, Transforms, ValidatedOptions, ValueKind,
};
