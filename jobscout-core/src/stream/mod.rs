//! Lifetime of the event stream subscription for the active run.
//!
//! A spawned task reads transport frames, decodes them once into typed
//! messages and forwards them over an unbounded channel. The owning session
//! is the single consumer; replacing or dropping the subscriber aborts the
//! task and discards anything still queued.

pub mod transport;

pub use transport::{SseTransport, StreamTransport, TransportFrame};

use std::sync::Arc;

use futures::StreamExt;
use jobscout_model::{LogPayload, RunEvent, RunId};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;

/// SSE event name of the standalone log channel.
pub const LOG_CHANNEL: &str = "log";

/// Data of frames sent only to keep the connection alive.
const KEEPALIVE: &str = "keepalive";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
}

/// A decoded message ready for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Opened,
    Event(RunEvent),
    Log(LogPayload),
    /// The connection dropped; carries the transport's reason.
    Disconnected(String),
}

/// Decodes one frame. Keepalives and malformed payloads yield `None`.
pub fn decode_frame(channel: &str, data: &str) -> Option<StreamMessage> {
    if data.is_empty() || data == KEEPALIVE {
        tracing::debug!("Received SSE keepalive");
        return None;
    }

    if channel == LOG_CHANNEL {
        match LogPayload::decode(data) {
            Ok(payload) => Some(StreamMessage::Log(payload)),
            Err(e) => {
                tracing::warn!("Failed to parse log payload: {} - Data: {}", e, data);
                None
            }
        }
    } else {
        match RunEvent::decode(data) {
            Ok(event) => Some(StreamMessage::Event(event)),
            Err(e) => {
                tracing::warn!(%channel, "Failed to parse run event: {} - Data: {}", e, data);
                None
            }
        }
    }
}

/// At most one live subscription, owned by one session.
#[derive(Debug)]
pub struct StreamSubscriber {
    transport: Arc<dyn StreamTransport>,
    receiver: Option<mpsc::UnboundedReceiver<StreamMessage>>,
    task: Option<JoinHandle<()>>,
    state: SubscriptionState,
    run_id: Option<RunId>,
}

impl StreamSubscriber {
    pub fn new(transport: Arc<dyn StreamTransport>) -> Self {
        Self {
            transport,
            receiver: None,
            task: None,
            state: SubscriptionState::Disconnected,
            run_id: None,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Run the current subscription was opened for.
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Opens a subscription for `run_id`, closing any existing one first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&mut self, run_id: &RunId) {
        self.close();

        let (tx, rx) = mpsc::unbounded_channel();
        let mut frames = self.transport.connect();
        let scope = run_id.clone();

        let task = tokio::spawn(async move {
            while let Some(frame) = frames.next().await {
                let message = match frame {
                    TransportFrame::Open => Some(StreamMessage::Opened),
                    TransportFrame::Message { channel, data } => decode_frame(&channel, &data),
                    TransportFrame::Error(reason) => {
                        tracing::error!("SSE error for run {}: {}", scope, reason);
                        let _ = tx.send(StreamMessage::Disconnected(reason));
                        return;
                    }
                };

                if let Some(message) = message
                    && tx.send(message).is_err()
                {
                    // Receiver dropped, exit task
                    return;
                }
            }

            tracing::warn!("SSE stream ended for run {}", scope);
            let _ = tx.send(StreamMessage::Disconnected("stream ended".to_string()));
        });

        self.receiver = Some(rx);
        self.task = Some(task);
        self.state = SubscriptionState::Connecting;
        self.run_id = Some(run_id.clone());
    }

    /// Closes the current subscription. Queued messages are discarded.
    pub fn close(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
        if self.receiver.take().is_some() {
            tracing::debug!(run = ?self.run_id, "subscription closed");
        }
        self.state = SubscriptionState::Disconnected;
        self.run_id = None;
    }

    /// Waits for the next decoded message. Returns `None` once no
    /// subscription is open; a `Disconnected` message closes it.
    pub async fn next_message(&mut self) -> Option<StreamMessage> {
        let receiver = self.receiver.as_mut()?;
        let Some(message) = receiver.recv().await else {
            self.close();
            return None;
        };

        self.observe(&message);
        Some(message)
    }

    /// Takes the next message that is already queued without waiting.
    pub fn try_next_message(&mut self) -> Option<StreamMessage> {
        let receiver = self.receiver.as_mut()?;
        let message = match receiver.try_recv() {
            Ok(message) => message,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                self.close();
                return None;
            }
        };

        self.observe(&message);
        Some(message)
    }

    fn observe(&mut self, message: &StreamMessage) {
        match message {
            StreamMessage::Opened => {
                tracing::info!(run = ?self.run_id, "SSE connection opened");
                self.state = SubscriptionState::Open;
            }
            StreamMessage::Disconnected(_) => self.close(),
            StreamMessage::Event(_) | StreamMessage::Log(_) => {}
        }
    }
}

impl Drop for StreamSubscriber {
    fn drop(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    fn run(id: &str) -> RunId {
        RunId::new(id).unwrap()
    }

    #[test]
    fn keepalive_frames_are_skipped() {
        assert_eq!(decode_frame("message", ""), None);
        assert_eq!(decode_frame("message", "keepalive"), None);
        assert_eq!(decode_frame(LOG_CHANNEL, "keepalive"), None);
    }

    #[test]
    fn log_channel_is_routed_separately() {
        let message = decode_frame(LOG_CHANNEL, r#"{"message":"m","category":"SCAN"}"#);
        assert_eq!(
            message,
            Some(StreamMessage::Log(LogPayload {
                message: "m".into(),
                category: Some("SCAN".into()),
            }))
        );

        let message = decode_frame("progress", r#"{"run_id":"r1","message":"m"}"#);
        assert!(matches!(message, Some(StreamMessage::Event(e)) if e.message == "m"));
    }

    #[test]
    fn malformed_frames_are_dropped() {
        assert_eq!(decode_frame(LOG_CHANNEL, "{not json"), None);
        assert_eq!(decode_frame("message", "42"), None);
    }

    #[tokio::test]
    async fn delivers_frames_in_order_then_disconnects() {
        let transport = ScriptedTransport::new(vec![
            TransportFrame::Open,
            TransportFrame::Message {
                channel: "progress".into(),
                data: r#"{"run_id":"r1","message":"a"}"#.into(),
            },
            TransportFrame::Message {
                channel: "heartbeat".into(),
                data: "keepalive".into(),
            },
            TransportFrame::Message {
                channel: LOG_CHANNEL.into(),
                data: r#"{"message":"b"}"#.into(),
            },
            TransportFrame::Error("connection reset".into()),
            TransportFrame::Message {
                channel: "progress".into(),
                data: r#"{"run_id":"r1","message":"never"}"#.into(),
            },
        ]);
        let mut subscriber = StreamSubscriber::new(Arc::new(transport));
        assert_eq!(subscriber.state(), SubscriptionState::Disconnected);

        subscriber.open(&run("r1"));
        assert_eq!(subscriber.state(), SubscriptionState::Connecting);

        assert_eq!(subscriber.next_message().await, Some(StreamMessage::Opened));
        assert_eq!(subscriber.state(), SubscriptionState::Open);

        let Some(StreamMessage::Event(event)) = subscriber.next_message().await else {
            panic!("expected an event");
        };
        assert_eq!(event.message, "a");

        assert!(matches!(
            subscriber.next_message().await,
            Some(StreamMessage::Log(payload)) if payload.message == "b"
        ));
        assert_eq!(
            subscriber.next_message().await,
            Some(StreamMessage::Disconnected("connection reset".into()))
        );
        assert_eq!(subscriber.state(), SubscriptionState::Disconnected);
        assert_eq!(subscriber.next_message().await, None);
    }

    #[tokio::test]
    async fn exhausted_stream_reports_disconnect() {
        let transport = ScriptedTransport::new(vec![TransportFrame::Open]);
        let mut subscriber = StreamSubscriber::new(Arc::new(transport));
        subscriber.open(&run("r1"));

        assert_eq!(subscriber.next_message().await, Some(StreamMessage::Opened));
        assert!(matches!(
            subscriber.next_message().await,
            Some(StreamMessage::Disconnected(_))
        ));
    }

    #[tokio::test]
    async fn reopening_replaces_previous_subscription() {
        let transport = Arc::new(ScriptedTransport::new(vec![TransportFrame::Open]));
        let mut subscriber = StreamSubscriber::new(transport.clone());

        subscriber.open(&run("r1"));
        subscriber.open(&run("r2"));

        assert_eq!(transport.connections(), 2);
        assert_eq!(subscriber.run_id().map(RunId::as_str), Some("r2"));
        assert_eq!(subscriber.state(), SubscriptionState::Connecting);
    }

    #[tokio::test]
    async fn try_next_message_takes_only_queued_frames() {
        let transport = ScriptedTransport::new(vec![
            TransportFrame::Open,
            TransportFrame::Message {
                channel: "progress".into(),
                data: r#"{"run_id":"r1","message":"a"}"#.into(),
            },
        ])
        .held_open();
        let mut subscriber = StreamSubscriber::new(Arc::new(transport));
        subscriber.open(&run("r1"));
        assert_eq!(subscriber.try_next_message(), None);

        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        assert_eq!(subscriber.try_next_message(), Some(StreamMessage::Opened));
        assert_eq!(subscriber.state(), SubscriptionState::Open);
        assert!(matches!(
            subscriber.try_next_message(),
            Some(StreamMessage::Event(event)) if event.message == "a"
        ));
        assert_eq!(subscriber.try_next_message(), None);
        assert_eq!(subscriber.state(), SubscriptionState::Open);
    }

    #[tokio::test]
    async fn closed_subscriber_yields_nothing() {
        let transport = ScriptedTransport::new(vec![TransportFrame::Open]);
        let mut subscriber = StreamSubscriber::new(Arc::new(transport));
        subscriber.open(&run("r1"));
        subscriber.close();

        assert_eq!(subscriber.state(), SubscriptionState::Disconnected);
        assert_eq!(subscriber.next_message().await, None);
        assert_eq!(subscriber.try_next_message(), None);
    }
}
