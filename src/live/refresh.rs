//! Delayed refresh signals for data derived outside the event log.
//!
//! Run metadata and reports are recomputed by the backend after certain
//! steps finish. When a delta carries one of those steps, a timer fires a
//! [`RefreshSignal`] after the configured delay so the front end can reload.

use crate::types::{Event, Step};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Ask the front end to reload run metadata and report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSignal {
    pub run_id: String,
    /// First qualifying event of the delta that scheduled this signal.
    pub trigger: Event,
}

/// First event in `delta` that should schedule a refresh.
pub fn refresh_trigger(delta: &[Event]) -> Option<&Event> {
    delta.iter().find(|event| {
        event.is_ok() && matches!(event.step, Step::Extract | Step::Completed | Step::Persist)
    })
}

/// Schedules one refresh timer per qualifying delta.
///
/// Timers are not coalesced. Dropping the trigger aborts every pending
/// timer, so no signal outlives the session.
#[derive(Debug)]
pub struct AutoRefreshTrigger {
    run_id: String,
    delay: Duration,
    tx: mpsc::UnboundedSender<RefreshSignal>,
    pending: Vec<JoinHandle<()>>,
}

impl AutoRefreshTrigger {
    pub fn new(
        run_id: impl Into<String>,
        delay: Duration,
        tx: mpsc::UnboundedSender<RefreshSignal>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            delay,
            tx,
            pending: Vec::new(),
        }
    }

    /// Inspect a delta and schedule a signal if it qualifies.
    ///
    /// Returns whether a timer was scheduled. Must run inside a tokio runtime.
    pub fn observe(&mut self, delta: &[Event]) -> bool {
        let Some(trigger) = refresh_trigger(delta) else {
            return false;
        };
        self.pending.retain(|handle| !handle.is_finished());

        let signal = RefreshSignal {
            run_id: self.run_id.clone(),
            trigger: trigger.clone(),
        };
        let tx = self.tx.clone();
        let delay = self.delay;
        tracing::debug!(run_id = %self.run_id, step = %signal.trigger.step, ?delay, "refresh scheduled");
        self.pending.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(signal);
        }));
        true
    }

    /// Timers that have not fired yet.
    pub fn pending(&self) -> usize {
        self.pending.iter().filter(|h| !h.is_finished()).count()
    }

    /// Abort every pending timer.
    pub fn cancel_all(&mut self) {
        for handle in self.pending.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for AutoRefreshTrigger {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
