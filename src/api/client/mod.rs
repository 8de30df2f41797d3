//! API client orchestration for the run backend.
//!
//! The client facade stays small:
//! - dispatch helpers live in `transport`.
//! - retry policy logic lives in `retry`.

mod retry;
mod transport;

use super::sse::SseDecoder;
use super::{PushStream, RunApi};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::types::{Event, RunDetail, RunReport};
use async_trait::async_trait;
use retry::RetryPolicy;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;

/// Client for the run backend REST and SSE endpoints.
pub struct ApiClient {
    http: reqwest::Client,
    stream_http: reqwest::Client,
    base_url: String,
    api_key: String,
    retry_policy: RetryPolicy,
}

impl ApiClient {
    /// Build a client from resolved API configuration.
    pub fn new(config: &ApiConfig) -> Self {
        Self::new_with_retry_policy(config, RetryPolicy::default())
    }

    fn new_with_retry_policy(config: &ApiConfig, retry_policy: RetryPolicy) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        Self {
            http: transport::build_http_client(timeout),
            stream_http: transport::build_stream_client(timeout),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
            retry_policy,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn bearer(&self) -> Option<&str> {
        (!self.api_key.is_empty()).then_some(self.api_key.as_str())
    }

    async fn get_text_with_retries(&self, path: &str) -> Result<String, ApiError> {
        self.get_text(path, self.retry_policy).await
    }

    async fn get_text(&self, path: &str, policy: RetryPolicy) -> Result<String, ApiError> {
        let url = self.url(path);
        let mut attempt: u32 = 0;
        loop {
            let result = match transport::get(&self.http, &url, self.bearer(), "application/json")
                .await
            {
                Ok(response) => response.text().await.map_err(ApiError::from),
                Err(err) => Err(err),
            };
            match result {
                Ok(body) => return Ok(body),
                Err(err) => {
                    if !policy.should_retry(&err, attempt) {
                        return Err(err);
                    }
                    let delay = policy.retry_delay_for(attempt, &err);
                    tracing::debug!(%url, attempt, ?delay, error = %err, "retrying request");
                    attempt = attempt.saturating_add(1);
                    sleep(delay).await;
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.get_text_with_retries(path).await?;
        serde_json::from_str(&body)
            .map_err(|err| ApiError::InvalidResponse(format!("{path}: {err}")))
    }
}

#[async_trait]
impl RunApi for ApiClient {
    async fn open_stream(&self, run_id: &str) -> Result<Box<dyn PushStream>, ApiError> {
        let url = self.url(&format!("/runs/{run_id}/stream"));
        let response =
            transport::get(&self.stream_http, &url, self.bearer(), "text/event-stream").await?;
        Ok(Box::new(HttpPushStream::new(response)))
    }

    async fn list_events(&self, run_id: &str) -> Result<Vec<Event>, ApiError> {
        let body = self
            .get_text_with_retries(&format!("/runs/{run_id}/events"))
            .await?;
        transport::decode_event_list(&body)
    }

    async fn poll_events(&self, run_id: &str) -> Result<Vec<Event>, ApiError> {
        let body = self
            .get_text(&format!("/runs/{run_id}/events"), RetryPolicy::single_attempt())
            .await?;
        transport::decode_event_list(&body)
    }

    async fn get_run(&self, run_id: &str) -> Result<RunDetail, ApiError> {
        self.get_json(&format!("/runs/{run_id}")).await
    }

    async fn get_report(&self, run_id: &str) -> Result<RunReport, ApiError> {
        self.get_json(&format!("/runs/{run_id}/report")).await
    }
}

/// SSE push channel backed by a streaming HTTP response body.
pub struct HttpPushStream {
    response: reqwest::Response,
    decoder: SseDecoder,
    finished: bool,
}

impl HttpPushStream {
    fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            decoder: SseDecoder::new(),
            finished: false,
        }
    }
}

#[async_trait]
impl PushStream for HttpPushStream {
    async fn next_payload(&mut self) -> Result<String, ApiError> {
        loop {
            if let Some(payload) = self.decoder.next_payload() {
                return Ok(payload);
            }
            if self.finished {
                return Err(ApiError::StreamClosed);
            }
            match self.response.chunk().await? {
                Some(bytes) => self.decoder.push(&bytes),
                None => {
                    self.decoder.finish();
                    self.finished = true;
                }
            }
        }
    }
}
