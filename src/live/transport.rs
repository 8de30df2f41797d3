//! Push and pull transports feeding a live session.
//!
//! The push channel runs on its own task and forwards what it reads into the
//! session; the pull fallback is a ticking timer with a hard ceiling that the
//! session drives directly.

use crate::api::RunApi;
use crate::error::ApiError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

/// How events currently reach the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    #[default]
    Connecting,
    Push,
    Poll,
    /// Polling hit its ceiling; no further events will arrive.
    Stopped,
}

impl TransportMode {
    /// Whether new events can still arrive.
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "Connecting",
            Self::Push => "Live via SSE",
            Self::Poll => "Live via Polling",
            Self::Stopped => "Polling stopped",
        })
    }
}

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

/// Message forwarded from the push reader task.
#[derive(Debug)]
pub enum StreamMessage {
    Opened,
    Payload(String),
    /// Terminal: open failure, read failure or end of body.
    Failed(ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Streaming,
    Closed,
}

/// Push-mode channel for one run.
///
/// Once closed it never reopens. Dropping the connection aborts the reader.
#[derive(Debug)]
pub struct StreamConnection {
    state: StreamState,
    reader: Option<JoinHandle<()>>,
}

impl StreamConnection {
    /// Start connecting; messages arrive on `tx` until the first failure.
    pub fn open(api: Arc<dyn RunApi>, run_id: String, tx: mpsc::Sender<StreamMessage>) -> Self {
        let reader = tokio::spawn(async move {
            let mut stream = match api.open_stream(&run_id).await {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = tx.send(StreamMessage::Failed(err)).await;
                    return;
                }
            };
            if tx.send(StreamMessage::Opened).await.is_err() {
                return;
            }
            loop {
                match stream.next_payload().await {
                    Ok(payload) => {
                        if tx.send(StreamMessage::Payload(payload)).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(StreamMessage::Failed(err)).await;
                        return;
                    }
                }
            }
        });
        Self {
            state: StreamState::Connecting,
            reader: Some(reader),
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == StreamState::Closed
    }

    pub fn mark_streaming(&mut self) {
        if self.state == StreamState::Connecting {
            self.state = StreamState::Streaming;
        }
    }

    /// Close for good and stop the reader.
    pub fn close(&mut self) {
        self.state = StreamState::Closed;
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

/// Outcome of waiting on the polling timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTick {
    /// Time to request the event list.
    Fetch,
    /// The ceiling elapsed; polling is over.
    Expired,
}

/// Fixed-interval pull timer bounded by a ceiling.
#[derive(Debug)]
pub struct PollingFallback {
    ticker: Interval,
    deadline: Instant,
    expired: bool,
}

impl PollingFallback {
    /// First request is one `period` after start.
    pub fn start(period: Duration, ceiling: Duration) -> Self {
        let now = Instant::now();
        let period = period.max(Duration::from_millis(1));
        let mut ticker = interval_at(now + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticker,
            deadline: now + ceiling,
            expired: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Wait for the next tick. Cancel safe.
    ///
    /// After [`PollTick::Expired`] has been returned this never completes.
    pub async fn next_tick(&mut self) -> PollTick {
        if self.expired {
            return std::future::pending().await;
        }
        tokio::select! {
            biased;
            _ = sleep_until(self.deadline) => {
                self.expired = true;
                PollTick::Expired
            }
            _ = self.ticker.tick() => PollTick::Fetch,
        }
    }
}
