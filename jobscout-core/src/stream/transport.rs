use std::fmt::Debug;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use reqwest_eventsource::{Event, EventSource};
use url::Url;

/// Raw transport-level frame, before any decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFrame {
    Open,
    /// `channel` is the SSE event name (`message` when untagged).
    Message { channel: String, data: String },
    /// The connection failed or dropped. Nothing follows an error.
    Error(String),
}

/// Source of server-pushed frames for the run event stream.
pub trait StreamTransport: Send + Sync + Debug {
    /// Opens a fresh connection. Dropping the stream closes it.
    fn connect(&self) -> BoxStream<'static, TransportFrame>;
}

/// `text/event-stream` transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct SseTransport {
    client: reqwest::Client,
    url: Url,
}

impl SseTransport {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl StreamTransport for SseTransport {
    fn connect(&self) -> BoxStream<'static, TransportFrame> {
        tracing::info!("Creating SSE connection to: {}", self.url);

        let source = match EventSource::new(self.client.get(self.url.clone())) {
            Ok(source) => source,
            Err(e) => {
                return stream::once(async move { TransportFrame::Error(e.to_string()) })
                    .boxed();
            }
        };

        // The event source retries on its own; close it after the first
        // error so a drop ends the stream instead.
        stream::unfold(Some(source), |state| async move {
            let mut source = state?;
            let frame = match source.next().await? {
                Ok(Event::Open) => TransportFrame::Open,
                Ok(Event::Message(msg)) => TransportFrame::Message {
                    channel: msg.event,
                    data: msg.data,
                },
                Err(e) => {
                    source.close();
                    return Some((TransportFrame::Error(e.to_string()), None));
                }
            };
            Some((frame, Some(source)))
        })
        .boxed()
    }
}
