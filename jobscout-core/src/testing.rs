//! In-memory collaborators for driving a session without a server.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use jobscout_model::{
    SourceSuggestions, StartRunRequest, StartRunResponse, StopRunRequest, StopRunResponse,
};

use crate::api::RunControl;
use crate::error::TransportError;
use crate::stream::{StreamTransport, TransportFrame};

/// Run control that records requests and answers from scripted state.
///
/// Run ids are taken from the queue filled by [`push_run_id`](Self::push_run_id);
/// once it is empty they are generated as `run-1`, `run-2`, ...
#[derive(Debug, Clone, Default)]
pub struct TestRunControl {
    inner: Arc<RwLock<InnerRunState>>,
}

#[derive(Debug, Default)]
struct InnerRunState {
    run_ids: VecDeque<String>,
    generated: usize,
    start_requests: Vec<StartRunRequest>,
    stop_requests: Vec<StopRunRequest>,
    start_failure: Option<(u16, String)>,
    stop_failure: Option<(u16, String)>,
    suggestions: Vec<String>,
}

impl TestRunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_run_id(&self, run_id: impl Into<String>) {
        if let Ok(mut guard) = self.inner.write() {
            guard.run_ids.push_back(run_id.into());
        }
    }

    /// Makes every following start fail with `status` and `detail`.
    pub fn fail_start(&self, status: u16, detail: impl Into<String>) {
        if let Ok(mut guard) = self.inner.write() {
            guard.start_failure = Some((status, detail.into()));
        }
    }

    /// Makes every following stop fail with `status` and `detail`.
    pub fn fail_stop(&self, status: u16, detail: impl Into<String>) {
        if let Ok(mut guard) = self.inner.write() {
            guard.stop_failure = Some((status, detail.into()));
        }
    }

    pub fn recover(&self) {
        if let Ok(mut guard) = self.inner.write() {
            guard.start_failure = None;
            guard.stop_failure = None;
        }
    }

    pub fn set_suggestions(&self, urls: Vec<String>) {
        if let Ok(mut guard) = self.inner.write() {
            guard.suggestions = urls;
        }
    }

    pub fn start_requests(&self) -> Vec<StartRunRequest> {
        self.inner
            .read()
            .map(|guard| guard.start_requests.clone())
            .unwrap_or_default()
    }

    pub fn stop_requests(&self) -> Vec<StopRunRequest> {
        self.inner
            .read()
            .map(|guard| guard.stop_requests.clone())
            .unwrap_or_default()
    }
}

fn poisoned() -> TransportError {
    TransportError::InvalidResponse("test run control state poisoned".into())
}

#[async_trait]
impl RunControl for TestRunControl {
    async fn start_run(
        &self,
        request: &StartRunRequest,
    ) -> Result<StartRunResponse, TransportError> {
        let mut guard = self.inner.write().map_err(|_| poisoned())?;
        guard.start_requests.push(request.clone());
        if let Some((status, detail)) = guard.start_failure.clone() {
            return Err(TransportError::Status { status, detail });
        }
        let run_id = match guard.run_ids.pop_front() {
            Some(run_id) => run_id,
            None => {
                guard.generated += 1;
                format!("run-{}", guard.generated)
            }
        };
        Ok(StartRunResponse { run_id })
    }

    async fn stop_run(&self, request: &StopRunRequest) -> Result<StopRunResponse, TransportError> {
        let mut guard = self.inner.write().map_err(|_| poisoned())?;
        guard.stop_requests.push(request.clone());
        if let Some((status, detail)) = guard.stop_failure.clone() {
            return Err(TransportError::Status { status, detail });
        }
        Ok(StopRunResponse {
            status: "stopping".into(),
            run_id: Some(request.run_id.to_string()),
        })
    }

    async fn suggest_sources(&self) -> Result<SourceSuggestions, TransportError> {
        let guard = self.inner.read().map_err(|_| poisoned())?;
        Ok(SourceSuggestions {
            urls: guard.suggestions.clone(),
        })
    }
}

/// Transport replaying scripted frames.
///
/// Each connection takes the next queued script; once the queue is empty the
/// default script is replayed. A held-open transport stays idle after the
/// last frame instead of ending the stream.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Vec<TransportFrame>>>,
    default_script: Vec<TransportFrame>,
    hold_open: bool,
    connections: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(frames: Vec<TransportFrame>) -> Self {
        Self {
            default_script: frames,
            ..Self::default()
        }
    }

    /// One script per connection, in connection order.
    pub fn with_scripts(scripts: Vec<Vec<TransportFrame>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            ..Self::default()
        }
    }

    pub fn held_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Number of connections opened so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl StreamTransport for ScriptedTransport {
    fn connect(&self) -> BoxStream<'static, TransportFrame> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        let frames = self
            .scripts
            .lock()
            .ok()
            .and_then(|mut scripts| scripts.pop_front())
            .unwrap_or_else(|| self.default_script.clone());

        let frames = stream::iter(frames);
        if self.hold_open {
            frames.chain(stream::pending()).boxed()
        } else {
            frames.boxed()
        }
    }
}

/// Helpers for building frames in tests.
pub mod frames {
    use super::TransportFrame;
    use crate::stream::LOG_CHANNEL;

    pub fn event(data: impl Into<String>) -> TransportFrame {
        TransportFrame::Message {
            channel: "message".into(),
            data: data.into(),
        }
    }

    pub fn log(data: impl Into<String>) -> TransportFrame {
        TransportFrame::Message {
            channel: LOG_CHANNEL.into(),
            data: data.into(),
        }
    }
}
