//! End-to-end live session tests.
//!
//! `http_*` tests run the real `ApiClient` against a tiny in-process HTTP
//! backend; the others drive a session through a scripted `RunApi`.

use async_trait::async_trait;
use runwatch::api::{ApiClient, PushStream, RunApi};
use runwatch::config::{ApiConfig, LiveConfig};
use runwatch::error::ApiError;
use runwatch::live::{spawn_session, SessionSnapshot, TransportMode};
use runwatch::types::{Event, EventStatus, RunDetail, RunReport, Step};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};

fn event_json(step: &str, status: &str, n: u32, message: Option<&str>) -> String {
    let message = message
        .map(|m| format!(r#","message":"{m}""#))
        .unwrap_or_default();
    format!(r#"{{"step":"{step}","status":"{status}"{message},"created_at":"2025-01-01T00:00:{n:02}"}}"#)
}

async fn wait_for<F>(rx: &mut watch::Receiver<SessionSnapshot>, pred: F) -> SessionSnapshot
where
    F: FnMut(&SessionSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), rx.wait_for(pred))
        .await
        .expect("timed out waiting for snapshot")
        .expect("session ended early")
        .clone()
}

// ---------------------------------------------------------------------------
// HTTP backend
// ---------------------------------------------------------------------------

/// Serves `/runs/run_1/stream` once (then closes the body) and answers every
/// other request with the full event list.
async fn spawn_backend(stream_body: String, list_body: String) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let list_hits = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&list_hits);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let stream_body = stream_body.clone();
            let list_body = list_body.clone();
            let hits = Arc::clone(&hits);
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).into_owned();
                let (content_type, body) = if request.starts_with("GET /runs/run_1/stream ") {
                    ("text/event-stream", stream_body)
                } else if request.starts_with("GET /runs/run_1/events ") {
                    hits.fetch_add(1, Ordering::SeqCst);
                    ("application/json", list_body)
                } else {
                    ("application/json", r#"{"id":"run_1","status":"running"}"#.to_string())
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, list_hits)
}

fn fast_live() -> LiveConfig {
    LiveConfig {
        poll_interval_ms: 50,
        poll_ceiling_secs: 30,
        refresh_delay_ms: 100,
    }
}

#[tokio::test]
async fn http_push_then_poll_fallback_dedups_by_cursor() {
    let pushed = [
        event_json("fetch", "started", 1, Some("Engine: openai (cycle 1/2)")),
        event_json("chunk", "ok", 2, Some("Hello")),
        event_json("completed", "ok", 3, None),
    ];
    let mut stream_body = String::from(": keep-alive\n\n");
    for payload in &pushed {
        stream_body.push_str(&format!("data: {payload}\n\n"));
    }
    stream_body.push_str("data: {broken\n\n");

    let list_body = format!(
        "[{},{},{},{},{}]",
        pushed[0],
        pushed[1],
        pushed[2],
        event_json("fetch", "started", 4, None),
        event_json("chunk", "ok", 5, Some("World")),
    );
    let (addr, list_hits) = spawn_backend(stream_body, list_body).await;

    let api: Arc<dyn RunApi> = Arc::new(ApiClient::new(&ApiConfig {
        base_url: format!("http://{addr}"),
        api_key: String::new(),
        timeout_secs: 5,
    }));
    let (handle, mut events) = spawn_session(api, "run_1", fast_live());
    handle.set_expected_cycles(Some(2)).await.unwrap();

    let snap = wait_for(&mut events.snapshots, |s| s.events.len() == 5).await;
    assert_eq!(snap.mode, TransportMode::Poll);
    assert_eq!(snap.buckets.len(), 2);
    assert_eq!(snap.buckets[0].len(), 3);
    assert_eq!(snap.buckets[1].len(), 2);
    assert_eq!(snap.streamed_text, "Hello");
    assert!(list_hits.load(Ordering::SeqCst) >= 1);

    handle.next_cycle().await.unwrap();
    let snap = wait_for(&mut events.snapshots, |s| s.selected_cycle == 2).await;
    assert_eq!(snap.streamed_text, "World");

    // The completed event qualified for a refresh.
    let signal = tokio::time::timeout(Duration::from_secs(5), events.refresh.recv())
        .await
        .expect("refresh in time")
        .expect("refresh signal");
    assert_eq!(signal.trigger.step, Step::Completed);

    handle.shutdown().await.unwrap();
}

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

struct ChannelStream(mpsc::UnboundedReceiver<String>);

#[async_trait]
impl PushStream for ChannelStream {
    async fn next_payload(&mut self) -> Result<String, ApiError> {
        self.0.recv().await.ok_or(ApiError::StreamClosed)
    }
}

#[derive(Default)]
struct Backend {
    stream: Mutex<Option<ChannelStream>>,
    listing: Mutex<Vec<Event>>,
    polls: AtomicUsize,
}

#[async_trait]
impl RunApi for Backend {
    async fn open_stream(&self, _run_id: &str) -> Result<Box<dyn PushStream>, ApiError> {
        match self.stream.lock().unwrap().take() {
            Some(stream) => Ok(Box::new(stream)),
            None => Err(ApiError::InvalidResponse("no stream".into())),
        }
    }

    async fn list_events(&self, _run_id: &str) -> Result<Vec<Event>, ApiError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.listing.lock().unwrap().clone())
    }

    async fn get_run(&self, run_id: &str) -> Result<RunDetail, ApiError> {
        Ok(RunDetail {
            id: run_id.to_string(),
            ..RunDetail::default()
        })
    }

    async fn get_report(&self, _run_id: &str) -> Result<RunReport, ApiError> {
        Ok(RunReport::default())
    }
}

fn ev(step: Step, status: EventStatus, n: u32) -> Event {
    Event::new(step, status, format!("2025-01-01T00:00:{n:02}"))
}

#[tokio::test(start_paused = true)]
async fn push_and_poll_are_never_active_together() {
    let (tx, rx) = mpsc::unbounded_channel();
    let backend = Arc::new(Backend {
        stream: Mutex::new(Some(ChannelStream(rx))),
        ..Backend::default()
    });
    let live = LiveConfig {
        poll_interval_ms: 1000,
        poll_ceiling_secs: 600,
        refresh_delay_ms: 1500,
    };
    let (handle, mut events) = spawn_session(backend.clone(), "run_1", live);

    tx.send(serde_json::to_string(&ev(Step::Fetch, EventStatus::Started, 1)).unwrap())
        .unwrap();
    wait_for(&mut events.snapshots, |s| s.events.len() == 1).await;

    // Long quiet push period: no polling happens while the channel is up.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.polls.load(Ordering::SeqCst), 0);
    assert_eq!(handle.snapshot().mode, TransportMode::Push);

    drop(tx);
    wait_for(&mut events.snapshots, |s| s.mode == TransportMode::Poll).await;
    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(backend.polls.load(Ordering::SeqCst), 3);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn refresh_signals_are_not_coalesced() {
    let (tx, rx) = mpsc::unbounded_channel();
    let backend = Arc::new(Backend {
        stream: Mutex::new(Some(ChannelStream(rx))),
        ..Backend::default()
    });
    let (_handle, mut events) = spawn_session(
        backend,
        "run_1",
        LiveConfig {
            poll_interval_ms: 1000,
            poll_ceiling_secs: 600,
            refresh_delay_ms: 1500,
        },
    );

    for (n, step) in [(1, Step::Extract), (2, Step::Persist), (3, Step::Completed)] {
        tx.send(serde_json::to_string(&ev(step, EventStatus::Ok, n)).unwrap())
            .unwrap();
    }
    wait_for(&mut events.snapshots, |s| s.events.len() == 3).await;

    let mut steps = Vec::new();
    for _ in 0..3 {
        steps.push(events.refresh.recv().await.expect("signal").trigger.step);
    }
    assert_eq!(steps.len(), 3);
    for expected in [Step::Extract, Step::Persist, Step::Completed] {
        assert!(steps.contains(&expected), "missing {expected}: {steps:?}");
    }
}
