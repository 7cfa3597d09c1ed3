//! Run-control collaborator: starting and stopping runs on the server.

pub mod client;
pub mod routes;

pub use client::ApiClient;

use async_trait::async_trait;
use jobscout_model::{
    SourceSuggestions, StartRunRequest, StartRunResponse, StopRunRequest, StopRunResponse,
};

use crate::error::TransportError;

/// Requests the session issues against the server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RunControl: Send + Sync {
    /// Asks the server to create a run over the given sources.
    async fn start_run(&self, request: &StartRunRequest)
    -> Result<StartRunResponse, TransportError>;

    /// Asks the server to terminate a run.
    async fn stop_run(&self, request: &StopRunRequest) -> Result<StopRunResponse, TransportError>;

    /// Fetches source URLs the server suggests for a new run.
    async fn suggest_sources(&self) -> Result<SourceSuggestions, TransportError>;
}
