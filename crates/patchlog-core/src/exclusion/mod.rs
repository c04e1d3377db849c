//! Exclusion filtering for diff operations
//!
//! Exclusion paths mark parts of a document that never enter the patch
//! history. Each diff operation is checked against every configured path:
//!
//! 1. A path that is a prefix of the operation path drops the operation.
//! 2. A path that reaches past the operation path into its value redacts
//!    that sub-tree from the value, dropping the operation if nothing else
//!    is left.
//!
//! Array indices are assumed stable for the duration of one diff; a literal
//! index segment always addresses the slot it names at diff time.

pub mod filter;
pub mod path;

pub use filter::ExclusionFilter;
pub use path::{ExclusionPath, Segment, Verdict};
