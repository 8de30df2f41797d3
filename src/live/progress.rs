//! Synchronous state core of a live session.
//!
//! [`RunProgress`] owns the event log for one run and everything derived
//! from it. Transports report into it through the `on_*` methods; readers
//! get clones via [`RunProgress::snapshot`].

use super::log::EventLog;
use super::segment::{segment, CycleBucket};
use super::text::assemble_text;
use super::toolbelt::Toolbelt;
use super::transport::TransportMode;
use super::view::ViewSelector;
use crate::error::ApiError;
use crate::types::Event;

/// Point-in-time copy of a session's state for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub run_id: String,
    pub mode: TransportMode,
    pub events: Vec<Event>,
    pub buckets: Vec<CycleBucket>,
    pub expected_total_cycles: usize,
    pub selected_cycle: usize,
    pub events_for_view: Vec<Event>,
    pub streamed_text: String,
    pub toolbelt: Toolbelt,
}

#[derive(Debug, Clone)]
pub struct RunProgress {
    run_id: String,
    log: EventLog,
    view: ViewSelector,
    mode: TransportMode,
    buckets: Vec<CycleBucket>,
}

impl RunProgress {
    pub fn new(run_id: impl Into<String>) -> Self {
        let mut progress = Self {
            run_id: run_id.into(),
            log: EventLog::new(),
            view: ViewSelector::default(),
            mode: TransportMode::Connecting,
            buckets: Vec::new(),
        };
        progress.resegment();
        progress
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    // -- transport callbacks --------------------------------------------

    pub fn on_stream_open(&mut self) {
        if self.mode == TransportMode::Connecting {
            tracing::info!(run_id = %self.run_id, "push channel open");
            self.mode = TransportMode::Push;
        }
    }

    /// Decode one push payload. Malformed payloads are dropped.
    pub fn on_stream_payload(&mut self, payload: &str) -> Vec<Event> {
        let event = match Event::parse(payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(run_id = %self.run_id, error = %err, "dropping malformed push payload");
                return Vec::new();
            }
        };
        let delta = self.log.append_pushed([event]).to_vec();
        self.resegment();
        delta
    }

    /// The push channel failed. Returns true when this switches to polling.
    pub fn on_stream_error(&mut self, err: &ApiError) -> bool {
        match self.mode {
            TransportMode::Connecting | TransportMode::Push => {
                tracing::warn!(run_id = %self.run_id, error = %err, "push channel lost, falling back to polling");
                self.mode = TransportMode::Poll;
                true
            }
            TransportMode::Poll | TransportMode::Stopped => false,
        }
    }

    /// Merge a full poll listing; only entries newer than the cursor land.
    pub fn on_poll_response(&mut self, events: Vec<Event>) -> Vec<Event> {
        let delta = self.log.append_polled(events).to_vec();
        if !delta.is_empty() {
            self.resegment();
        }
        delta
    }

    pub fn on_poll_expired(&mut self) {
        tracing::info!(run_id = %self.run_id, events = self.log.len(), "polling ceiling reached");
        self.mode = TransportMode::Stopped;
    }

    // -- cycle context --------------------------------------------------

    /// Apply the run's cycle count; absent means one cycle.
    pub fn set_expected_total_cycles(&mut self, total: Option<u32>) {
        let total = total.map_or(1, |n| n as usize).max(1);
        if total != self.view.total() {
            self.view.set_total(total);
            self.resegment();
        }
    }

    pub fn expected_total_cycles(&self) -> usize {
        self.view.total()
    }

    pub fn selected_cycle(&self) -> usize {
        self.view.selected()
    }

    pub fn select_cycle(&mut self, cycle: usize) {
        self.view.select(cycle);
    }

    pub fn next_cycle(&mut self) {
        self.view.next();
    }

    pub fn previous_cycle(&mut self) {
        self.view.previous();
    }

    // -- derived views --------------------------------------------------

    pub fn buckets(&self) -> &[CycleBucket] {
        &self.buckets
    }

    pub fn events_for_view(&self) -> &[Event] {
        self.view.events_for_view(&self.buckets)
    }

    pub fn streamed_text(&self) -> String {
        assemble_text(self.events_for_view(), self.log.events())
    }

    /// Tool activity for the selected cycle, or the whole run while the
    /// selected cycle has no events.
    pub fn toolbelt(&self) -> Toolbelt {
        let view = self.events_for_view();
        if view.is_empty() {
            Toolbelt::from_events(self.log.events())
        } else {
            Toolbelt::from_events(view)
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            run_id: self.run_id.clone(),
            mode: self.mode,
            events: self.log.events().to_vec(),
            buckets: self.buckets.clone(),
            expected_total_cycles: self.view.total(),
            selected_cycle: self.view.selected(),
            events_for_view: self.events_for_view().to_vec(),
            streamed_text: self.streamed_text(),
            toolbelt: self.toolbelt(),
        }
    }

    fn resegment(&mut self) {
        self.buckets = segment(self.log.events(), self.view.total());
    }
}
