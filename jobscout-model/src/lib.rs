//! Core data model definitions shared across jobscout crates.
#![allow(missing_docs)]

pub mod error;
pub mod events;
pub mod ids;
pub mod job;
pub mod log;
pub mod region;
pub mod run;

// Intentionally curated re-exports for downstream consumers.
pub use error::{ModelError, Result as ModelResult};
#[cfg(feature = "serde")]
pub use events::EventEnvelope;
pub use events::{EventKind, LogPayload, RunEvent};
pub use ids::{LogEntryId, RunId};
pub use job::{JobEntry, JobPosting, format_score};
pub use log::{LogCategory, LogEntry};
pub use region::{DEFAULT_REGIONS, FALLBACK_REGION, resolve_region};
pub use run::{
    RunLifecycle, SourceSuggestions, StartRunRequest, StartRunResponse,
    StopRunRequest, StopRunResponse,
};
