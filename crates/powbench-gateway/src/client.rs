//! Gateway trait and its reqwest-backed HTTP implementation.

use std::time::Duration;

use futures::future::BoxFuture;
use powbench_core::{BatchRequest, Error, PowBenchConfig, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::types::*;

pub const SYNC_PATH: &str = "/api/sync";
pub const ASYNC_PATH: &str = "/api/async";
pub const ASYNC_STATUS_PATH: &str = "/api/async/status";
pub const HEALTH_PATH: &str = "/api/health";

/// Operations the engine consumes from the remote processor.
///
/// Transport failures, non-success statuses and undecodable bodies all come
/// back as an `Err`, never as an empty result.
pub trait Gateway: Send + Sync {
    /// Blocking submit-and-wait: process every seed in order.
    fn process_sequential<'a>(
        &'a self,
        request: &'a BatchRequest,
    ) -> BoxFuture<'a, Result<SequentialResponse>>;

    /// Fire-and-forget submit: returns one acknowledgment per seed.
    fn submit_async<'a>(
        &'a self,
        request: &'a BatchRequest,
    ) -> BoxFuture<'a, Result<AsyncSubmitResponse>>;

    /// Status of previously acknowledged items.
    fn poll_status<'a>(&'a self, request_ids: &'a [String]) -> BoxFuture<'a, Result<StatusResponse>>;

    /// Reachability check.
    fn liveness(&self) -> BoxFuture<'_, Result<LivenessResponse>>;

    /// Where this gateway points, for user-facing messages.
    fn endpoint(&self) -> &str;
}

/// JSON/HTTP gateway client.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base: String,
    client: Client,
}

impl HttpGateway {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {}", e)))?;
        let base = base.into().trim_end_matches('/').to_string();
        Ok(Self { base, client })
    }

    pub fn from_config(config: &PowBenchConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.api_base(), config.request_timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {}", self.url(path));
        let response = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request to {} failed: {}", path, e)))?;
        self.decode(path, response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {}", self.url(path));
        let response = self
            .client
            .get(self.url(path))
            .header("Accept", "application/json")
            .header("Cache-Control", "no-store")
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request to {} failed: {}", path, e)))?;
        self.decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(&self, path: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Http(format!("Failed to read response from {}: {}", path, e)))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            let text = text.trim();
            let detail = if text.is_empty() { "Request failed" } else { text };
            return Err(Error::Gateway(format!("{} returned {}: {}", path, status, detail)));
        }

        serde_json::from_slice(&body).map_err(|e| {
            Error::MalformedResponse(format!("Invalid JSON response from {}: {}", self.url(path), e))
        })
    }
}

impl Gateway for HttpGateway {
    fn process_sequential<'a>(
        &'a self,
        request: &'a BatchRequest,
    ) -> BoxFuture<'a, Result<SequentialResponse>> {
        Box::pin(self.post_json(SYNC_PATH, request))
    }

    fn submit_async<'a>(
        &'a self,
        request: &'a BatchRequest,
    ) -> BoxFuture<'a, Result<AsyncSubmitResponse>> {
        Box::pin(self.post_json(ASYNC_PATH, request))
    }

    fn poll_status<'a>(&'a self, request_ids: &'a [String]) -> BoxFuture<'a, Result<StatusResponse>> {
        Box::pin(async move {
            let body = StatusRequest {
                request_ids: request_ids.to_vec(),
            };
            self.post_json(ASYNC_STATUS_PATH, &body).await
        })
    }

    fn liveness(&self) -> BoxFuture<'_, Result<LivenessResponse>> {
        Box::pin(self.get_json(HEALTH_PATH))
    }

    fn endpoint(&self) -> &str {
        &self.base
    }
}
