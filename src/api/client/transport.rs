//! HTTP transport helpers shared by REST calls and the push channel.

use crate::api::parse_retry_after_secs;
use crate::error::ApiError;
use crate::types::Event;
use serde_json::Value;
use std::time::Duration;

/// Build the client used for bounded REST requests.
pub(super) fn build_http_client(timeout: Duration) -> reqwest::Client {
    // Fall back to reqwest defaults if builder creation fails for any reason.
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Build the client used for the long-lived push channel.
///
/// Only connecting is bounded; a whole-request timeout would cut a healthy
/// stream.
pub(super) fn build_stream_client(connect_timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Send one GET and map non-2xx answers to [`ApiError::Status`].
pub(super) async fn get(
    http: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    accept: &str,
) -> Result<reqwest::Response, ApiError> {
    let mut req = http.get(url).header("Accept", accept);
    if let Some(token) = bearer.filter(|value| !value.trim().is_empty()) {
        req = req.header("Authorization", format!("Bearer {token}"));
    }

    let response = req.send().await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let retry_after_secs = parse_retry_after_secs(response.headers());
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::status(status, body, retry_after_secs));
    }
    Ok(response)
}

/// Decode an event-list body, skipping entries that do not parse.
pub(super) fn decode_event_list(body: &str) -> Result<Vec<Event>, ApiError> {
    let entries: Vec<Value> = serde_json::from_str(body)
        .map_err(|err| ApiError::InvalidResponse(format!("invalid event list: {err}")))?;
    let total = entries.len();
    let events: Vec<Event> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();
    if events.len() < total {
        tracing::debug!(
            skipped = total - events.len(),
            "dropped malformed entries from event list"
        );
    }
    Ok(events)
}
