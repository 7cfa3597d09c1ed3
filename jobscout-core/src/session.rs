//! Run identity, lifecycle and the reconciliation loop.

use std::sync::Arc;

use jobscout_model::{RunId, RunLifecycle, StartRunRequest, StopRunRequest};

use crate::api::RunControl;
use crate::error::{Result, TransportError, ValidationError};
use crate::projection::{ProjectionLayout, RunProjection, RunSummary};
use crate::reconciler::{Outcome, Reconciler};
use crate::sources::{merge_suggestions, parse_source_urls};
use crate::stream::{StreamMessage, StreamSubscriber, StreamTransport, SubscriptionState};
use crate::strings;
use crate::time::TimeProvider;

/// A run accepted by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub run_id: RunId,
    /// Sources the run was started with, as sent.
    pub urls: Vec<String>,
}

/// Effect of one stream message on the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    Connected,
    Reconciled(Outcome),
    Logged,
    /// The stream dropped. A fresh `start` is needed to resume.
    Disconnected(String),
}

/// Owns the tracked run and its projection.
///
/// The session is the only writer: every mutation happens inside
/// [`start`](Self::start), [`stop`](Self::stop) or [`apply`](Self::apply),
/// and readers borrow the projection between messages.
pub struct RunSession {
    control: Arc<dyn RunControl>,
    subscriber: StreamSubscriber,
    reconciler: Reconciler,
    layout: ProjectionLayout,
    projection: RunProjection,
    run_id: Option<RunId>,
    lifecycle: RunLifecycle,
    use_mock_outbound: bool,
}

impl std::fmt::Debug for RunSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunSession")
            .field("run_id", &self.run_id)
            .field("lifecycle", &self.lifecycle)
            .field("subscription", &self.subscriber.state())
            .field("use_mock_outbound", &self.use_mock_outbound)
            .finish()
    }
}

impl RunSession {
    pub fn new(control: Arc<dyn RunControl>, transport: Arc<dyn StreamTransport>) -> Self {
        let layout = ProjectionLayout::default();
        Self {
            control,
            subscriber: StreamSubscriber::new(transport),
            reconciler: Reconciler::default(),
            projection: RunProjection::new(&layout),
            layout,
            run_id: None,
            lifecycle: RunLifecycle::Idle,
            use_mock_outbound: false,
        }
    }

    /// Region set and log capacity used for every fresh projection.
    pub fn with_layout(mut self, layout: ProjectionLayout) -> Self {
        self.projection = RunProjection::new(&layout);
        self.layout = layout;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.reconciler = Reconciler::new(clock);
        self
    }

    /// Asks the server to deliver to its mock outbound sink.
    pub fn with_mock_outbound(mut self, enabled: bool) -> Self {
        self.use_mock_outbound = enabled;
        self
    }

    pub fn projection(&self) -> &RunProjection {
        &self.projection
    }

    pub fn lifecycle(&self) -> RunLifecycle {
        self.lifecycle
    }

    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    pub fn subscription_state(&self) -> SubscriptionState {
        self.subscriber.state()
    }

    pub fn summary(&self) -> RunSummary {
        self.projection.summary()
    }

    /// The activity log as export lines, newest first.
    pub fn export_logs(&self) -> String {
        self.projection.logs.export()
    }

    /// Starts a run over the sources in `raw_input`, superseding any
    /// previous run and subscription.
    ///
    /// Input without a usable line fails before any request is made. A failed
    /// request, or a start abandoned before the server answers, leaves
    /// lifecycle and projection as they were.
    pub async fn start(&mut self, raw_input: &str) -> Result<RunHandle> {
        let urls = parse_source_urls(raw_input);
        if urls.is_empty() {
            return Err(ValidationError.into());
        }

        let request = StartRunRequest {
            raw_urls: raw_input.to_string(),
            urls,
            use_mock_outbound: self.use_mock_outbound,
        };
        let run_id = {
            let _starting = StartingGuard::enter(&mut self.lifecycle);
            Self::request_run(self.control.as_ref(), &request)
                .await
                .inspect_err(|e| tracing::error!("failed to start run: {}", e))?
        };

        self.subscriber.close();
        self.projection = RunProjection::new(&self.layout);
        self.projection.status_text = strings::run_started(run_id.as_str());
        self.run_id = Some(run_id.clone());
        self.lifecycle = RunLifecycle::Active;
        self.subscriber.open(&run_id);

        tracing::info!(run = %run_id, sources = request.urls.len(), "run started");

        Ok(RunHandle {
            run_id,
            urls: request.urls,
        })
    }

    async fn request_run(
        control: &dyn RunControl,
        request: &StartRunRequest,
    ) -> std::result::Result<RunId, TransportError> {
        let response = control.start_run(request).await?;
        RunId::new(response.run_id).map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }

    /// Asks the server to terminate the active run. A no-op without one.
    ///
    /// The projection stays inspectable; the run id is cleared so anything
    /// still arriving for it is discarded.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(run_id) = self.run_id.clone().filter(|_| self.lifecycle.is_active()) else {
            tracing::debug!(lifecycle = ?self.lifecycle, "stop without an active run");
            return Ok(());
        };

        let ack = self
            .control
            .stop_run(&StopRunRequest {
                run_id: run_id.clone(),
            })
            .await
            .inspect_err(|e| tracing::error!(run = %run_id, "failed to stop run: {}", e))?;

        tracing::info!(run = %run_id, status = %ack.status, "run stopped");
        // Reconcile what arrived for the run before its id is cleared.
        while let Some(message) = self.subscriber.try_next_message() {
            self.apply(message);
        }
        self.lifecycle = RunLifecycle::Stopped;
        self.projection.status_text = strings::RUN_STOPPED.to_string();
        self.run_id = None;
        Ok(())
    }

    /// Fetches suggested sources and merges them into `pending`.
    pub async fn suggest_sources(&self, pending: &str) -> Result<String> {
        let suggestions = self.control.suggest_sources().await?;
        Ok(merge_suggestions(&suggestions.urls, pending))
    }

    /// Applies one decoded stream message to the projection.
    pub fn apply(&mut self, message: StreamMessage) -> SessionUpdate {
        match message {
            StreamMessage::Opened => SessionUpdate::Connected,
            StreamMessage::Event(event) => SessionUpdate::Reconciled(self.reconciler.apply(
                &mut self.projection,
                self.run_id.as_ref(),
                event,
            )),
            StreamMessage::Log(payload) => {
                self.reconciler.apply_log(&mut self.projection, payload);
                SessionUpdate::Logged
            }
            StreamMessage::Disconnected(reason) => {
                self.reconciler.apply_disconnect(&mut self.projection);
                SessionUpdate::Disconnected(reason)
            }
        }
    }

    /// Waits for and applies the next stream message. Returns `None` when no
    /// subscription is open.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        let message = self.subscriber.next_message().await?;
        Some(self.apply(message))
    }
}

/// Holds the lifecycle at `Starting` while a start request is in flight.
///
/// Dropping the guard restores the previous lifecycle, including when the
/// start future itself is dropped mid-request.
struct StartingGuard<'a> {
    lifecycle: &'a mut RunLifecycle,
    previous: RunLifecycle,
}

impl<'a> StartingGuard<'a> {
    fn enter(lifecycle: &'a mut RunLifecycle) -> Self {
        let previous = std::mem::replace(lifecycle, RunLifecycle::Starting);
        Self {
            lifecycle,
            previous,
        }
    }
}

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        if *self.lifecycle == RunLifecycle::Starting {
            *self.lifecycle = self.previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockRunControl;
    use crate::projection::Metrics;
    use crate::stream::TransportFrame;
    use crate::testing::{ScriptedTransport, frames};
    use crate::time::FixedTimeProvider;
    use async_trait::async_trait;
    use futures::{FutureExt, future};
    use jobscout_model::{
        DEFAULT_REGIONS, RunEvent, SourceSuggestions, StartRunResponse, StopRunResponse,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session(control: MockRunControl, transport: ScriptedTransport) -> RunSession {
        RunSession::new(Arc::new(control), Arc::new(transport))
            .with_clock(Arc::new(FixedTimeProvider::at_time(8, 0, 0).unwrap()))
    }

    fn accepting(run_ids: &'static [&'static str]) -> MockRunControl {
        let mut control = MockRunControl::new();
        let mut ids = run_ids.iter();
        control
            .expect_start_run()
            .times(run_ids.len())
            .returning(move |_| {
                Ok(StartRunResponse {
                    run_id: ids.next().unwrap().to_string(),
                })
            });
        control
    }

    /// Accepts the first start as `r1` and never answers later ones.
    #[derive(Debug, Default)]
    struct StallingControl {
        starts: AtomicUsize,
    }

    #[async_trait]
    impl RunControl for StallingControl {
        async fn start_run(
            &self,
            _request: &StartRunRequest,
        ) -> std::result::Result<StartRunResponse, TransportError> {
            if self.starts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(StartRunResponse {
                    run_id: "r1".into(),
                });
            }
            future::pending().await
        }

        async fn stop_run(
            &self,
            request: &StopRunRequest,
        ) -> std::result::Result<StopRunResponse, TransportError> {
            Ok(StopRunResponse {
                status: "stopping".into(),
                run_id: Some(request.run_id.to_string()),
            })
        }

        async fn suggest_sources(&self) -> std::result::Result<SourceSuggestions, TransportError> {
            Ok(SourceSuggestions { urls: Vec::new() })
        }
    }

    fn passed(run_id: &str, url: &str) -> StreamMessage {
        StreamMessage::Event(
            RunEvent::decode(&format!(
                r#"{{"run_id":"{run_id}","event_type":"success","message":"ok",
                "data":{{"event":"job_passed","job":{{"url":"{url}","region":"מרכז"}}}}}}"#
            ))
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn blank_input_fails_without_request() {
        let mut session = session(MockRunControl::new(), ScriptedTransport::default());

        let err = session.start(" \n\t\n").await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(session.lifecycle(), RunLifecycle::Idle);
        assert!(session.run_id().is_none());
        assert_eq!(session.projection().status_text, strings::READY);
    }

    #[tokio::test]
    async fn blank_input_keeps_previous_projection() {
        let mut session = session(accepting(&["r1"]), ScriptedTransport::default().held_open());
        session.start("https://a").await.unwrap();
        session.apply(passed("r1", "https://a/1"));

        assert!(session.start("").await.unwrap_err().is_validation());
        assert_eq!(session.projection().metrics.passed, 1);
        assert_eq!(session.run_id().map(RunId::as_str), Some("r1"));
    }

    #[tokio::test]
    async fn start_sends_parsed_urls_and_activates() {
        let mut control = MockRunControl::new();
        control
            .expect_start_run()
            .withf(|request| {
                request.urls == ["https://a/jobs", "https://b"]
                    && request.raw_urls == " https://a/jobs\n\nhttps://b"
                    && request.use_mock_outbound
            })
            .times(1)
            .returning(|_| {
                Ok(StartRunResponse {
                    run_id: "r1".into(),
                })
            });
        let mut session = session(control, ScriptedTransport::default().held_open())
            .with_mock_outbound(true);

        let handle = session.start(" https://a/jobs\n\nhttps://b").await.unwrap();

        assert_eq!(handle.run_id.as_str(), "r1");
        assert_eq!(handle.urls.len(), 2);
        assert_eq!(session.lifecycle(), RunLifecycle::Active);
        assert_eq!(session.projection().status_text, "ריצה r1");
        assert_eq!(session.subscription_state(), SubscriptionState::Connecting);
    }

    #[tokio::test]
    async fn failed_start_leaves_state_unchanged() {
        let mut control = MockRunControl::new();
        control.expect_start_run().times(1).returning(|_| {
            Err(TransportError::Status {
                status: 400,
                detail: "No valid URLs provided".into(),
            })
        });
        let mut session = session(control, ScriptedTransport::default());

        let err = session.start("https://a").await.unwrap_err();

        assert!(matches!(
            err,
            crate::SessionError::Transport(TransportError::Status { status: 400, .. })
        ));
        assert_eq!(session.lifecycle(), RunLifecycle::Idle);
        assert!(session.run_id().is_none());
        assert_eq!(session.subscription_state(), SubscriptionState::Disconnected);
    }

    #[tokio::test]
    async fn blank_run_id_is_an_invalid_response() {
        let mut session = session(accepting(&[" "]), ScriptedTransport::default());

        let err = session.start("https://a").await.unwrap_err();

        assert!(matches!(
            err,
            crate::SessionError::Transport(TransportError::InvalidResponse(_))
        ));
        assert_eq!(session.lifecycle(), RunLifecycle::Idle);
    }

    #[tokio::test]
    async fn new_run_resets_projection_and_drops_stale_events() {
        let mut session = session(
            accepting(&["r1", "r2"]),
            ScriptedTransport::default().held_open(),
        );
        session.start("https://a").await.unwrap();
        session.apply(passed("r1", "https://a/1"));
        assert_eq!(session.projection().metrics.scanned, 1);

        session.start("https://b").await.unwrap();

        let projection = session.projection();
        assert_eq!(projection.metrics, Metrics::default());
        assert!(projection.logs.is_empty());
        assert_eq!(projection.regions.region_names().collect::<Vec<_>>(), DEFAULT_REGIONS);
        assert_eq!(projection.regions.total_jobs(), 0);

        let update = session.apply(passed("r1", "https://a/2"));
        assert_eq!(update, SessionUpdate::Reconciled(Outcome::Discarded));
        assert_eq!(session.projection().metrics, Metrics::default());

        session.apply(passed("r2", "https://b/1"));
        assert_eq!(session.projection().metrics.passed, 1);
    }

    #[tokio::test]
    async fn stop_without_run_is_a_no_op() {
        let mut session = session(MockRunControl::new(), ScriptedTransport::default());
        session.stop().await.unwrap();
        assert_eq!(session.lifecycle(), RunLifecycle::Idle);
    }

    #[tokio::test]
    async fn stop_keeps_projection_and_clears_run() {
        let mut control = accepting(&["r1"]);
        control
            .expect_stop_run()
            .withf(|request| request.run_id.as_str() == "r1")
            .times(1)
            .returning(|request| {
                Ok(StopRunResponse {
                    status: "stopping".into(),
                    run_id: Some(request.run_id.to_string()),
                })
            });
        let mut session = session(control, ScriptedTransport::default().held_open());
        session.start("https://a").await.unwrap();
        session.apply(passed("r1", "https://a/1"));

        session.stop().await.unwrap();

        assert_eq!(session.lifecycle(), RunLifecycle::Stopped);
        assert!(session.run_id().is_none());
        assert_eq!(session.projection().status_text, strings::RUN_STOPPED);
        assert_eq!(session.projection().metrics.passed, 1);
        assert_eq!(session.projection().regions.total_jobs(), 1);

        // A second stop has nothing to stop.
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_reconciles_events_already_received() {
        let mut control = accepting(&["r1"]);
        control.expect_stop_run().times(1).returning(|request| {
            Ok(StopRunResponse {
                status: "stopping".into(),
                run_id: Some(request.run_id.to_string()),
            })
        });
        let transport = ScriptedTransport::new(vec![
            TransportFrame::Open,
            frames::event(
                r#"{"run_id":"r1","event_type":"success","message":"ok",
                "data":{"event":"job_passed","job":{"url":"https://a/1","region":"מרכז"}}}"#,
            ),
        ])
        .held_open();
        let mut session = session(control, transport);
        session.start("https://a").await.unwrap();
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        session.stop().await.unwrap();

        assert_eq!(session.lifecycle(), RunLifecycle::Stopped);
        assert_eq!(session.projection().metrics.passed, 1);
        assert_eq!(session.projection().regions.total_jobs(), 1);
        assert_eq!(session.projection().status_text, strings::RUN_STOPPED);
        assert_eq!(session.subscription_state(), SubscriptionState::Open);
    }

    #[tokio::test]
    async fn abandoned_start_keeps_active_run() {
        let mut session = RunSession::new(
            Arc::new(StallingControl::default()),
            Arc::new(ScriptedTransport::default().held_open()),
        );
        session.start("https://a").await.unwrap();

        assert!(session.start("https://b").now_or_never().is_none());

        assert_eq!(session.lifecycle(), RunLifecycle::Active);
        assert_eq!(session.run_id().map(RunId::as_str), Some("r1"));
        session.stop().await.unwrap();
        assert_eq!(session.lifecycle(), RunLifecycle::Stopped);
    }

    #[tokio::test]
    async fn abandoned_first_start_returns_to_idle() {
        let control = StallingControl {
            starts: AtomicUsize::new(1),
        };
        let mut session =
            RunSession::new(Arc::new(control), Arc::new(ScriptedTransport::default()));

        assert!(session.start("https://a").now_or_never().is_none());

        assert_eq!(session.lifecycle(), RunLifecycle::Idle);
        assert!(session.run_id().is_none());
    }

    #[tokio::test]
    async fn failed_stop_keeps_run_active() {
        let mut control = accepting(&["r1"]);
        control.expect_stop_run().times(1).returning(|_| {
            Err(TransportError::Status {
                status: 503,
                detail: "unavailable".into(),
            })
        });
        let mut session = session(control, ScriptedTransport::default().held_open());
        session.start("https://a").await.unwrap();

        assert!(session.stop().await.is_err());
        assert_eq!(session.lifecycle(), RunLifecycle::Active);
        assert_eq!(session.run_id().map(RunId::as_str), Some("r1"));
    }

    #[tokio::test]
    async fn next_update_reconciles_stream_until_disconnect() {
        let transport = ScriptedTransport::new(vec![
            crate::stream::TransportFrame::Open,
            frames::event(
                r#"{"run_id":"r1","event_type":"progress","message":"scan",
                "data":{"event":"job_skipped"}}"#,
            ),
            frames::log(r#"{"message":"[SCAN] page","category":"SCAN"}"#),
            crate::stream::TransportFrame::Error("reset".into()),
        ]);
        let mut session = session(accepting(&["r1"]), transport);
        session.start("https://a").await.unwrap();

        assert_eq!(session.next_update().await, Some(SessionUpdate::Connected));
        assert_eq!(
            session.next_update().await,
            Some(SessionUpdate::Reconciled(Outcome::JobSkipped))
        );
        assert_eq!(session.next_update().await, Some(SessionUpdate::Logged));
        assert_eq!(
            session.next_update().await,
            Some(SessionUpdate::Disconnected("reset".into()))
        );
        assert_eq!(session.next_update().await, None);

        let lines: Vec<_> = session.export_logs().lines().map(str::to_owned).collect();
        assert_eq!(
            lines,
            [
                "[08:00:00] [ERROR] חיבור SSE נותק",
                "[08:00:00] [SCAN] [SCAN] page",
                "[08:00:00] [INFO] scan",
            ]
        );
        assert_eq!(session.projection().metrics.failed, 1);
    }

    #[tokio::test]
    async fn suggestions_merge_into_pending_input() {
        let mut control = MockRunControl::new();
        control.expect_suggest_sources().times(1).returning(|| {
            Ok(jobscout_model::SourceSuggestions {
                urls: vec!["https://s".into()],
            })
        });
        let session = session(control, ScriptedTransport::default());

        let merged = session.suggest_sources("https://mine\nhttps://s").await.unwrap();
        assert_eq!(merged, "https://s\nhttps://mine");
    }
}
