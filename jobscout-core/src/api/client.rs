use std::time::Duration;

use async_trait::async_trait;
use jobscout_model::{
    SourceSuggestions, StartRunRequest, StartRunResponse, StopRunRequest, StopRunResponse,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use super::{RunControl, routes};
use crate::error::TransportError;
use crate::stream::SseTransport;

/// HTTP client for the run server.
///
/// The underlying `reqwest::Client` only bounds connection setup; the total
/// timeout is applied per JSON request so the same client can carry the
/// long-lived event stream.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().connect_timeout(timeout).build()?;

        tracing::info!("[ApiClient] Creating API client with base URL: {}", base_url);

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a route against the base URL, keeping any base path prefix.
    pub fn build_url(&self, path: &str) -> Result<Url, TransportError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Event stream transport sharing this client's connection pool.
    pub fn event_transport(&self) -> Result<SseTransport, TransportError> {
        Ok(SseTransport::new(
            self.client.clone(),
            self.build_url(routes::EVENTS_STREAM)?,
        ))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = request.timeout(self.timeout).send().await?;
        decode_response(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let url = self.build_url(path)?;
        tracing::debug!("GET {}", url);
        self.send(self.client.get(url)).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.build_url(path)?;
        tracing::debug!("POST {}", url);
        self.send(self.client.post(url).json(body)).await
    }
}

/// Maps a non-success status to [`TransportError::Status`], preferring the
/// server's `detail` field over the raw body.
async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(&body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });
        tracing::warn!("Server responded {}: {}", status, detail);
        return Err(TransportError::Status {
            status: status.as_u16(),
            detail,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| TransportError::InvalidResponse(e.to_string()))
}

fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl RunControl for ApiClient {
    async fn start_run(
        &self,
        request: &StartRunRequest,
    ) -> Result<StartRunResponse, TransportError> {
        self.post_json(routes::RUNS_START, request).await
    }

    async fn stop_run(&self, request: &StopRunRequest) -> Result<StopRunResponse, TransportError> {
        self.post_json(routes::RUNS_STOP, request).await
    }

    async fn suggest_sources(&self) -> Result<SourceSuggestions, TransportError> {
        self.get_json(routes::SOURCES_SUGGEST).await
    }
}
