//! Core types shared across patchlog facilities
//!
//! This crate provides foundational types used by the error, logging and
//! lifecycle layers:
//!
//! - **Correlation types**: OperationId for pairing before/after hook calls
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::OperationId;
