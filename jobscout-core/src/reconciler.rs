//! Applies decoded stream messages to a [`RunProjection`].
//!
//! Every step runs to completion synchronously; the reconciler never awaits,
//! so a projection is only observable between two messages.

use std::sync::Arc;

use jobscout_model::{
    EventKind, JobEntry, LogCategory, LogEntry, LogPayload, RunEvent, RunId,
};

use crate::projection::RunProjection;
use crate::strings;
use crate::time::{SystemTimeProvider, TimeProvider};

/// Severity tag of entries appended from the `log` channel.
const LOG_CHANNEL_SEVERITY: &str = "info";

/// Severity tag of the entry recorded when the stream drops.
const DISCONNECT_SEVERITY: &str = "error";

/// What a reconciliation step did to the projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The event belonged to another run (or none); nothing changed.
    Discarded,
    /// Status line and log updated, no kind-specific effect.
    Logged,
    /// Counted as passed; `region` is set when a posting was admitted.
    JobPassed { region: Option<String> },
    JobSkipped,
    /// `entries` rows were flagged as delivered.
    OutboundSaved { entries: usize },
}

impl Outcome {
    pub fn is_discarded(&self) -> bool {
        matches!(self, Outcome::Discarded)
    }
}

/// Event-kind dispatch and field defaulting over one projection.
#[derive(Debug, Clone)]
pub struct Reconciler {
    clock: Arc<dyn TimeProvider>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(Arc::new(SystemTimeProvider))
    }
}

impl Reconciler {
    pub fn new(clock: Arc<dyn TimeProvider>) -> Self {
        Self { clock }
    }

    fn log(
        &self,
        projection: &mut RunProjection,
        message: String,
        severity: &str,
        category: LogCategory,
    ) {
        let entry = LogEntry::new(message, severity, category, self.clock.log_time());
        projection.logs.append(entry);
    }

    /// Reconciles one default-channel event against the run identified by
    /// `active`. Events for any other run, or arriving while no run is
    /// active, are discarded untouched.
    pub fn apply(
        &self,
        projection: &mut RunProjection,
        active: Option<&RunId>,
        event: RunEvent,
    ) -> Outcome {
        let Some(run_id) = active.filter(|run| event.belongs_to(run)) else {
            tracing::debug!(
                event_run = ?event.run_id,
                active_run = ?active.map(RunId::as_str),
                "discarding event for inactive run"
            );
            return Outcome::Discarded;
        };

        let RunEvent {
            event_type,
            message,
            category,
            kind,
            ..
        } = event;

        projection.status_text.clone_from(&message);
        let category = LogCategory::resolve(category.as_deref(), &event_type);
        self.log(projection, message, &event_type, category);

        let outcome = match kind {
            EventKind::JobPassed { job } => {
                projection.metrics.record_passed();
                let region = job.map(|posting| {
                    let declared = posting.region.clone();
                    projection
                        .regions
                        .admit(declared.as_deref(), JobEntry::from_posting(posting))
                        .to_string()
                });
                Outcome::JobPassed { region }
            }
            EventKind::JobSkipped => {
                projection.metrics.record_failed();
                Outcome::JobSkipped
            }
            EventKind::OutboundSaved { url: Some(url) } => {
                let entries = projection
                    .regions
                    .amend(&url, |job| job.outbound_saved = true);
                if entries == 0 {
                    tracing::debug!(%url, "outbound_saved for unknown posting");
                }
                Outcome::OutboundSaved { entries }
            }
            EventKind::OutboundSaved { url: None } => {
                Outcome::OutboundSaved { entries: 0 }
            }
            EventKind::Unknown { .. } => Outcome::Logged,
        };

        tracing::trace!(run = %run_id, ?outcome, "event reconciled");
        outcome
    }

    /// Appends a standalone `log` channel payload. No identity filter and no
    /// kind dispatch apply; the status line is left alone.
    pub fn apply_log(&self, projection: &mut RunProjection, payload: LogPayload) {
        let category = LogCategory::resolve(payload.category.as_deref(), LOG_CHANNEL_SEVERITY);
        self.log(projection, payload.message, LOG_CHANNEL_SEVERITY, category);
    }

    /// Records that the event stream dropped.
    pub fn apply_disconnect(&self, projection: &mut RunProjection) {
        self.log(
            projection,
            strings::STREAM_DISCONNECTED.to_string(),
            DISCONNECT_SEVERITY,
            LogCategory::infer(DISCONNECT_SEVERITY),
        );
    }
}
