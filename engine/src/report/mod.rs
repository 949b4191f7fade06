//! Turning search results into a scored, persisted research report.

pub mod aggregate;
pub mod compose;
pub mod persist;

pub use aggregate::{quality_score, rank_results};
pub use compose::compose_report;
pub use persist::{resolve_slug, save_report, ArtifactPaths, PersistError};
