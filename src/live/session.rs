//! Live session actor.
//!
//! One tokio task owns the [`RunProgress`] of a run. It starts on the push
//! channel, falls back to polling for good on the first push failure, applies
//! front-end commands, and publishes a fresh [`SessionSnapshot`] after every
//! change. Everything it started is torn down when it exits.
//!
//! A poll request in flight is one more `select!` branch, so commands and the
//! polling ceiling are never held up behind a slow backend.

use super::progress::{RunProgress, SessionSnapshot};
use super::refresh::{AutoRefreshTrigger, RefreshSignal};
use super::transport::{PollTick, PollingFallback, StreamConnection, StreamMessage};
use crate::api::RunApi;
use crate::config::LiveConfig;
use crate::error::{ApiError, WatchError};
use crate::types::{Event, RunDetail};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Commands accepted by a running session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    SelectCycle(usize),
    NextCycle,
    PreviousCycle,
    /// Fresh run metadata; its `cycles_total` becomes the expected cycle count.
    SetRunDetail(Box<RunDetail>),
    SetExpectedCycles(Option<u32>),
    Shutdown,
}

/// Handle for steering a spawned session.
///
/// Dropping every clone ends the session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Send one command to the session actor.
    pub async fn send(&self, command: SessionCommand) -> Result<(), WatchError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| WatchError::SessionClosed)
    }

    pub async fn select_cycle(&self, cycle: usize) -> Result<(), WatchError> {
        self.send(SessionCommand::SelectCycle(cycle)).await
    }

    pub async fn next_cycle(&self) -> Result<(), WatchError> {
        self.send(SessionCommand::NextCycle).await
    }

    pub async fn previous_cycle(&self) -> Result<(), WatchError> {
        self.send(SessionCommand::PreviousCycle).await
    }

    pub async fn set_run_detail(&self, detail: RunDetail) -> Result<(), WatchError> {
        self.send(SessionCommand::SetRunDetail(Box::new(detail)))
            .await
    }

    pub async fn set_expected_cycles(&self, total: Option<u32>) -> Result<(), WatchError> {
        self.send(SessionCommand::SetExpectedCycles(total)).await
    }

    pub async fn shutdown(&self) -> Result<(), WatchError> {
        self.send(SessionCommand::Shutdown).await
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Outputs of a spawned session.
pub struct SessionEvents {
    /// Updated after every change; closes when the session ends.
    pub snapshots: watch::Receiver<SessionSnapshot>,
    /// Delayed reload requests for run metadata and report.
    pub refresh: mpsc::UnboundedReceiver<RefreshSignal>,
}

/// Spawn a live session for `run_id` on the current tokio runtime.
pub fn spawn_session(
    api: Arc<dyn RunApi>,
    run_id: impl Into<String>,
    live: LiveConfig,
) -> (SessionHandle, SessionEvents) {
    let run_id = run_id.into();
    let (command_tx, command_rx) = mpsc::channel::<SessionCommand>(32);
    let (refresh_tx, refresh_rx) = mpsc::unbounded_channel::<RefreshSignal>();
    let (stream_tx, stream_rx) = mpsc::channel::<StreamMessage>(64);

    let progress = RunProgress::new(run_id.clone());
    let (snapshot_tx, snapshot_rx) = watch::channel(progress.snapshot());

    let actor = SessionActor {
        stream: Some(StreamConnection::open(
            Arc::clone(&api),
            run_id.clone(),
            stream_tx,
        )),
        refresh: AutoRefreshTrigger::new(run_id, live.refresh_delay(), refresh_tx),
        api,
        progress,
        live,
        stream_rx,
        poll: None,
        in_flight: None,
        snapshots: snapshot_tx,
    };
    tokio::spawn(actor.run(command_rx));

    (
        SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx.clone(),
        },
        SessionEvents {
            snapshots: snapshot_rx,
            refresh: refresh_rx,
        },
    )
}

type PollRequest = Pin<Box<dyn Future<Output = Result<Vec<Event>, ApiError>> + Send>>;

async fn next_poll_tick(poll: &mut Option<PollingFallback>) -> PollTick {
    match poll.as_mut() {
        Some(poll) => poll.next_tick().await,
        None => std::future::pending().await,
    }
}

async fn poll_response(request: &mut Option<PollRequest>) -> Result<Vec<Event>, ApiError> {
    match request.as_mut() {
        Some(request) => request.await,
        None => std::future::pending().await,
    }
}

struct SessionActor {
    api: Arc<dyn RunApi>,
    progress: RunProgress,
    live: LiveConfig,
    stream: Option<StreamConnection>,
    stream_rx: mpsc::Receiver<StreamMessage>,
    poll: Option<PollingFallback>,
    /// Dropping it cancels the request.
    in_flight: Option<PollRequest>,
    refresh: AutoRefreshTrigger,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionActor {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        tracing::debug!(run_id = %self.progress.run_id(), "session started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.apply_command(command),
                },
                message = self.stream_rx.recv(), if self.stream.is_some() => {
                    let message =
                        message.unwrap_or(StreamMessage::Failed(ApiError::StreamClosed));
                    self.on_stream_message(message);
                }
                tick = next_poll_tick(&mut self.poll) => match tick {
                    PollTick::Fetch => self.start_poll(),
                    PollTick::Expired => {
                        self.poll = None;
                        self.in_flight = None;
                        self.progress.on_poll_expired();
                        self.publish();
                    }
                },
                response = poll_response(&mut self.in_flight), if self.in_flight.is_some() => {
                    self.in_flight = None;
                    self.on_poll_response(response);
                }
            }
        }
        self.teardown();
    }

    fn apply_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SelectCycle(cycle) => self.progress.select_cycle(cycle),
            SessionCommand::NextCycle => self.progress.next_cycle(),
            SessionCommand::PreviousCycle => self.progress.previous_cycle(),
            SessionCommand::SetRunDetail(detail) => {
                self.progress.set_expected_total_cycles(detail.cycles_total)
            }
            SessionCommand::SetExpectedCycles(total) => {
                self.progress.set_expected_total_cycles(total)
            }
            SessionCommand::Shutdown => return,
        }
        self.publish();
    }

    fn on_stream_message(&mut self, message: StreamMessage) {
        match message {
            StreamMessage::Opened => {
                if let Some(stream) = self.stream.as_mut() {
                    stream.mark_streaming();
                }
                self.progress.on_stream_open();
            }
            StreamMessage::Payload(payload) => {
                let delta = self.progress.on_stream_payload(&payload);
                if delta.is_empty() {
                    return;
                }
                self.refresh.observe(&delta);
            }
            StreamMessage::Failed(err) => {
                if let Some(mut stream) = self.stream.take() {
                    stream.close();
                }
                if self.progress.on_stream_error(&err) {
                    self.poll = Some(PollingFallback::start(
                        self.live.poll_interval(),
                        self.live.poll_ceiling(),
                    ));
                }
            }
        }
        self.publish();
    }

    fn start_poll(&mut self) {
        if self.in_flight.is_some() {
            tracing::debug!(run_id = %self.progress.run_id(), "previous poll still in flight");
            return;
        }
        let api = Arc::clone(&self.api);
        let run_id = self.progress.run_id().to_string();
        self.in_flight = Some(Box::pin(async move { api.poll_events(&run_id).await }));
    }

    fn on_poll_response(&mut self, response: Result<Vec<Event>, ApiError>) {
        let events = match response {
            Ok(events) => events,
            Err(err) => {
                tracing::debug!(run_id = %self.progress.run_id(), error = %err, "poll request failed");
                return;
            }
        };
        let delta = self.progress.on_poll_response(events);
        if delta.is_empty() {
            return;
        }
        self.refresh.observe(&delta);
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.progress.snapshot());
    }

    fn teardown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
        self.poll = None;
        self.in_flight = None;
        self.refresh.cancel_all();
        tracing::debug!(
            run_id = %self.progress.run_id(),
            events = self.progress.log().len(),
            "session closed"
        );
    }
}
