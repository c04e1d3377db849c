//! JSON Patch primitive (RFC 6902 subset: add, replace, remove).
//!
//! - [`compare`] generates the operations that turn one document into another
//! - [`apply`] replays operations onto a document
//! - [`pointer`] holds the RFC 6901 path helpers shared by both

pub mod apply;
pub mod compare;
pub mod model;
pub mod pointer;

pub use apply::{apply, apply_operation};
pub use compare::compare;
pub use model::{OpKind, Operation};
