//! Shared test fixtures for config, API and live-session test modules.
//!
//! Keeping tiny but reusable helpers here prevents each test module from
//! rebuilding temp dir, HTTP server and event fixture code.

use crate::api::{PushStream, RunApi};
use crate::error::ApiError;
use crate::types::{Event, EventStatus, RunDetail, RunReport, Step};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temporary directory fixture with best-effort cleanup.
#[derive(Debug)]
pub struct TestTempDir {
    path: PathBuf,
}

impl TestTempDir {
    /// Create a unique temporary directory with a readable prefix.
    pub fn new(prefix: &str) -> Self {
        let suffix = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let dir = std::env::temp_dir().join(format!("runwatch-{prefix}-{millis}-{suffix}"));
        fs::create_dir_all(&dir).expect("failed to create temporary fixture directory");
        Self { path: dir }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build a child path under the fixture root.
    pub fn child(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    /// Write UTF-8 text to a child path, creating parent directories as needed.
    pub fn write_text(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.child(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directories for fixture");
        }
        fs::write(&path, content).expect("failed to write fixture file");
        path
    }
}

impl Drop for TestTempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

// ---------------------------------------------------------------------------
// HTTP fixtures
// ---------------------------------------------------------------------------

/// Build one SSE `data:` block.
pub fn sse_data_block(data: &str) -> String {
    format!("data: {data}\n\n")
}

/// Raw HTTP/1.1 response with a fixed body.
pub fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Accept a single connection, answer it with `response`, and hand back the
/// raw request head.
pub async fn serve_once(response: String) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut buf = [0u8; 8192];
        let n = stream.read(&mut buf).await.unwrap_or(0);
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
        String::from_utf8_lossy(&buf[..n]).into_owned()
    });
    (addr, handle)
}

// ---------------------------------------------------------------------------
// Event fixtures
// ---------------------------------------------------------------------------

/// Event at a compact fixture timestamp (`t01`, `t02`, ...).
pub fn ev(step: &str, status: EventStatus, n: u32) -> Event {
    Event::new(Step::from(step), status, ts(n))
}

/// Chunk event carrying answer text.
pub fn chunk(text: &str, n: u32) -> Event {
    Event::new(Step::Chunk, EventStatus::Ok, ts(n)).with_message(text)
}

/// Fixed-width fixture timestamp that orders lexicographically.
pub fn ts(n: u32) -> String {
    format!("2025-01-01T00:00:{n:02}")
}

/// JSON payload for an event as the push channel delivers it.
pub fn payload(event: &Event) -> String {
    serde_json::to_string(event).expect("serialize event")
}

// ---------------------------------------------------------------------------
// Scripted run API
// ---------------------------------------------------------------------------

/// Sender half feeding a [`ScriptedStream`]; dropping it ends the stream.
pub type StreamFeed = mpsc::UnboundedSender<Result<String, ApiError>>;

/// Push stream fed by the test through an unbounded channel.
pub struct ScriptedStream {
    rx: mpsc::UnboundedReceiver<Result<String, ApiError>>,
}

#[async_trait]
impl PushStream for ScriptedStream {
    async fn next_payload(&mut self) -> Result<String, ApiError> {
        match self.rx.recv().await {
            Some(item) => item,
            None => Err(ApiError::StreamClosed),
        }
    }
}

/// In-memory [`RunApi`] with scripted stream and poll responses.
#[derive(Default)]
pub struct ScriptedApi {
    stream: Mutex<Option<ScriptedStream>>,
    polls: Mutex<VecDeque<Result<Vec<Event>, ApiError>>>,
    /// Returned once `polls` is exhausted.
    steady_poll: Mutex<Vec<Event>>,
    /// Applied to every poll before it answers.
    poll_delay: Mutex<Option<Duration>>,
    pub poll_calls: AtomicUsize,
    pub open_calls: AtomicUsize,
}

impl ScriptedApi {
    /// API whose push channel cannot be opened.
    pub fn without_stream() -> Self {
        Self::default()
    }

    /// API with an open push channel; the returned feed drives it.
    pub fn with_stream() -> (Self, StreamFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        let api = Self {
            stream: Mutex::new(Some(ScriptedStream { rx })),
            ..Self::default()
        };
        (api, tx)
    }

    pub fn queue_poll(&self, response: Result<Vec<Event>, ApiError>) {
        self.polls.lock().expect("polls lock").push_back(response);
    }

    pub fn set_steady_poll(&self, events: Vec<Event>) {
        *self.steady_poll.lock().expect("steady lock") = events;
    }

    pub fn set_poll_delay(&self, delay: Duration) {
        *self.poll_delay.lock().expect("delay lock") = Some(delay);
    }

    pub fn poll_count(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RunApi for ScriptedApi {
    async fn open_stream(&self, _run_id: &str) -> Result<Box<dyn PushStream>, ApiError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        match self.stream.lock().expect("stream lock").take() {
            Some(stream) => Ok(Box::new(stream)),
            None => Err(ApiError::Status {
                code: 503,
                body: "stream unavailable".to_string(),
                retry_after_secs: None,
            }),
        }
    }

    async fn list_events(&self, _run_id: &str) -> Result<Vec<Event>, ApiError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.poll_delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(next) = self.polls.lock().expect("polls lock").pop_front() {
            return next;
        }
        Ok(self.steady_poll.lock().expect("steady lock").clone())
    }

    async fn get_run(&self, run_id: &str) -> Result<RunDetail, ApiError> {
        Ok(RunDetail {
            id: run_id.to_string(),
            ..RunDetail::default()
        })
    }

    async fn get_report(&self, run_id: &str) -> Result<RunReport, ApiError> {
        Ok(RunReport {
            id: run_id.to_string(),
            ..RunReport::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_fixture_writes_and_resolves_paths() {
        let fixture = TestTempDir::new("fixture");
        let file = fixture.write_text("nested/file.txt", "hello");
        assert_eq!(fs::read_to_string(file).unwrap(), "hello");
        assert!(fixture.path().exists());
    }

    #[test]
    fn http_response_sets_content_length() {
        let raw = http_response("200 OK", "application/json", "[]");
        assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(raw.contains("content-length: 2\r\n"));
        assert!(raw.ends_with("\r\n\r\n[]"));
    }

    #[test]
    fn fixture_timestamps_sort() {
        assert!(ts(9) < ts(10));
        assert_eq!(chunk("x", 1).chunk_text(), Some("x"));
    }

    #[tokio::test]
    async fn scripted_stream_ends_when_feed_drops() {
        let (api, feed) = ScriptedApi::with_stream();
        let mut stream = api.open_stream("r").await.expect("open");
        feed.send(Ok("one".to_string())).unwrap();
        drop(feed);
        assert_eq!(stream.next_payload().await.unwrap(), "one");
        assert!(matches!(
            stream.next_payload().await,
            Err(ApiError::StreamClosed)
        ));
        assert!(api.open_stream("r").await.is_err());
    }
}
