//! Events pushed by the server for one run.
//!
//! Frames arrive as loosely structured JSON (`{run_id, event_type, message,
//! data}` where `data` is an open mapping). They are decoded exactly once, at
//! the stream boundary, into a [`RunEvent`] whose [`EventKind`] carries only
//! the fields the matching handler needs.

use crate::ids::RunId;
use crate::job::JobPosting;

/// Discriminator of the kind-specific handling an event receives.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A posting passed filtering. `job` is absent when the payload carried
    /// no usable posting object.
    JobPassed { job: Option<JobPosting> },
    JobSkipped,
    /// A passed posting was delivered downstream.
    OutboundSaved { url: Option<String> },
    /// Any other discriminator, or none at all.
    Unknown { raw: Option<String> },
}

impl EventKind {
    pub fn name(&self) -> &str {
        match self {
            EventKind::JobPassed { .. } => "job_passed",
            EventKind::JobSkipped => "job_skipped",
            EventKind::OutboundSaved { .. } => "outbound_saved",
            EventKind::Unknown { raw } => raw.as_deref().unwrap_or("none"),
        }
    }
}

/// A decoded default-channel event.
#[derive(Debug, Clone, PartialEq)]
pub struct RunEvent {
    pub run_id: Option<String>,
    /// Severity tag (`progress`, `error`, `done`, ...).
    pub event_type: String,
    pub message: String,
    /// Explicit display category from `data.category`.
    pub category: Option<String>,
    pub kind: EventKind,
}

impl RunEvent {
    /// Whether this event was emitted for `run`.
    pub fn belongs_to(&self, run: &RunId) -> bool {
        self.run_id.as_deref() == Some(run.as_str())
    }
}

/// A standalone payload from the named `log` channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogPayload {
    #[cfg_attr(feature = "serde", serde(default))]
    pub message: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub category: Option<String>,
}

#[cfg(feature = "serde")]
mod wire {
    use super::{EventKind, LogPayload, RunEvent};
    use crate::error::Result;
    use crate::job::JobPosting;
    use serde::Deserialize;
    use serde_json::Value;

    /// The event record exactly as the server serializes it.
    #[derive(Debug, Clone, Deserialize)]
    pub struct EventEnvelope {
        #[serde(default)]
        pub run_id: Option<String>,
        #[serde(default)]
        pub event_type: Option<String>,
        #[serde(default)]
        pub message: Option<String>,
        #[serde(default)]
        pub data: Option<Value>,
    }

    fn data_str<'a>(data: Option<&'a Value>, key: &str) -> Option<&'a str> {
        data?.get(key)?.as_str()
    }

    impl From<EventEnvelope> for RunEvent {
        fn from(envelope: EventEnvelope) -> Self {
            let data = envelope.data.as_ref();

            let kind = match data_str(data, "event") {
                Some("job_passed") => EventKind::JobPassed {
                    job: data
                        .and_then(|d| d.get("job"))
                        .and_then(JobPosting::from_value),
                },
                Some("job_skipped") => EventKind::JobSkipped,
                Some("outbound_saved") => EventKind::OutboundSaved {
                    url: data_str(data, "job_url")
                        .filter(|url| !url.is_empty())
                        .map(str::to_owned),
                },
                other => EventKind::Unknown {
                    raw: other.map(str::to_owned),
                },
            };

            RunEvent {
                category: data_str(data, "category").map(str::to_owned),
                run_id: envelope.run_id,
                event_type: envelope.event_type.unwrap_or_default(),
                message: envelope.message.unwrap_or_default(),
                kind,
            }
        }
    }

    impl RunEvent {
        /// Decodes one default-channel frame.
        pub fn decode(raw: &str) -> Result<Self> {
            let envelope: EventEnvelope = serde_json::from_str(raw)?;
            Ok(envelope.into())
        }
    }

    impl LogPayload {
        /// Decodes one `log` channel frame.
        pub fn decode(raw: &str) -> Result<Self> {
            Ok(serde_json::from_str(raw)?)
        }
    }
}

#[cfg(feature = "serde")]
pub use wire::EventEnvelope;
