use crate::ids::RunId;

/// Lifecycle of the run tracked by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RunLifecycle {
    #[default]
    Idle,
    Starting,
    Active,
    Stopped,
}

impl RunLifecycle {
    pub fn is_active(self) -> bool {
        matches!(self, RunLifecycle::Active)
    }
}

/// Body of the run creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StartRunRequest {
    /// The untouched free-text input, forwarded for server-side extraction.
    pub raw_urls: String,
    pub urls: Vec<String>,
    pub use_mock_outbound: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StartRunResponse {
    pub run_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StopRunRequest {
    pub run_id: RunId,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StopRunResponse {
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub run_id: Option<String>,
}

/// Recently successful sources offered as seed input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceSuggestions {
    #[cfg_attr(feature = "serde", serde(default))]
    pub urls: Vec<String>,
}
