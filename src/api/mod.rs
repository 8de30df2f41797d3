//! HTTP client for the run backend.
//!
//! The API layer is split into cohesive modules:
//! - `client`: reqwest dispatch, retry policy and the SSE push stream
//! - `sse`: incremental decoder for `text/event-stream` bodies

use crate::error::ApiError;
use crate::types::{Event, RunDetail, RunReport};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::SystemTime;

mod client;
mod sse;

pub use client::{ApiClient, HttpPushStream};

/// Run backend interface consumed by live sessions and the front end.
///
/// This trait lets tests script event feeds and transport failures without
/// network calls while the production path uses [`ApiClient`].
#[async_trait]
pub trait RunApi: Send + Sync {
    /// Open the push channel for one run.
    async fn open_stream(&self, run_id: &str) -> Result<Box<dyn PushStream>, ApiError>;
    /// Full ordered event list for one run. Malformed entries are skipped.
    async fn list_events(&self, run_id: &str) -> Result<Vec<Event>, ApiError>;
    /// One polling round of the event list.
    ///
    /// Polling repeats on its own schedule, so implementations should make a
    /// single attempt rather than retry.
    async fn poll_events(&self, run_id: &str) -> Result<Vec<Event>, ApiError> {
        self.list_events(run_id).await
    }
    /// Run metadata, including the expected number of cycles.
    async fn get_run(&self, run_id: &str) -> Result<RunDetail, ApiError>;
    /// Citation metrics derived by the backend.
    async fn get_report(&self, run_id: &str) -> Result<RunReport, ApiError>;
}

/// An open push channel yielding raw event payloads.
#[async_trait]
pub trait PushStream: Send {
    /// Wait for the next `data` payload.
    ///
    /// Any error, including [`ApiError::StreamClosed`] at end of body, ends
    /// the channel for good.
    async fn next_payload(&mut self) -> Result<String, ApiError>;
}

/// Parse a `Retry-After` header in either delta-seconds or HTTP-date form.
pub(crate) fn parse_retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(secs);
    }
    let at = httpdate::parse_http_date(raw).ok()?;
    Some(
        at.duration_since(SystemTime::now())
            .map(|delta| delta.as_secs())
            .unwrap_or(0),
    )
}
