//! Patchlog Engine - patch history orchestration
//!
//! Wires the core diff/exclusion/rollback logic to a document store:
//! - `PatchHistory` records patches from lifecycle hooks
//! - `TrackedCollection` is the model layer that drives those hooks
//! - `TrackedDocument` exposes `data()`, `patches()` and `rollback()`
//! - `PatchQuery` reads patch records back in date order

pub mod collection;
pub mod history;
pub mod hooks;
pub mod patches;
pub mod tracked;

pub use collection::{ModelSpec, ReturnDocument, TrackedCollection};
pub use history::{PatchHistory, PatchHistoryBuilder};
pub use hooks::{LifecycleHooks, UpdateCapture, UpdateContext};
pub use patches::PatchQuery;
pub use tracked::TrackedDocument;
