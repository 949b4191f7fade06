//! Session resource lifecycle
//!
//! Sessions are created lazily on first activity and carry opaque
//! `(kind, id)` resource handles. A single reaper task removes sessions
//! that have been idle for the configured timeout and dispatches cleanup
//! for each of their resources; `research_workflow` resources cascade into
//! the workflow registry.

pub mod cleanup;
mod reaper;
pub mod registry;

pub use cleanup::{CascadingCleaner, CleanupError, ResourceCleaner, ResourceKind};
pub use registry::{Session, SessionConfig, SessionError, SessionRegistry};
