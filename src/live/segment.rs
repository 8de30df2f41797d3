//! Partitioning of the flat event timeline into execution cycles.
//!
//! A cycle ends after a successful `completed`, after any `error`, or
//! between a successful `delay` and the `fetch` that immediately follows it.
//! Boundaries are found by walking a small [`CyclePhase`] state machine over
//! the log, then the bucket list is reconciled to the expected cycle count.

use crate::types::{Event, EventStatus, Step};

/// Events attributed to one execution cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleBucket {
    pub events: Vec<Event>,
}

impl CycleBucket {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

/// Where a cycle currently stands while scanning the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePhase {
    #[default]
    Idle,
    Fetching,
    Extracting,
    /// Last event was a successful cooldown; a `fetch` now opens a new cycle.
    Delaying,
    Completed,
    Errored,
}

/// Cycle boundary produced by one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    None,
    /// Close the open cycle, then add the event to a new one.
    Before,
    /// Add the event, then close the cycle.
    After,
}

impl CyclePhase {
    /// Advance on one event.
    pub fn advance(self, step: &Step, status: EventStatus) -> (CyclePhase, Boundary) {
        if self == CyclePhase::Delaying && *step == Step::Fetch {
            return (CyclePhase::Fetching, Boundary::Before);
        }
        match (step, status) {
            (Step::Completed, EventStatus::Ok) => (CyclePhase::Completed, Boundary::After),
            (Step::Error, _) => (CyclePhase::Errored, Boundary::After),
            (Step::Delay, EventStatus::Ok) => (CyclePhase::Delaying, Boundary::None),
            (Step::Fetch, _) => (CyclePhase::Fetching, Boundary::None),
            (Step::Extract, _) => (CyclePhase::Extracting, Boundary::None),
            _ => match self {
                CyclePhase::Delaying | CyclePhase::Completed | CyclePhase::Errored => {
                    (CyclePhase::Idle, Boundary::None)
                }
                other => (other, Boundary::None),
            },
        }
    }
}

/// Split `log` into exactly `max(expected_total_cycles, 1)` buckets.
///
/// Concatenating the result always reproduces `log`.
pub fn segment(log: &[Event], expected_total_cycles: usize) -> Vec<CycleBucket> {
    reconcile(split_cycles(log), expected_total_cycles.max(1))
}

/// Raw boundary split, before reconciliation.
fn split_cycles(log: &[Event]) -> Vec<CycleBucket> {
    let mut buckets = Vec::new();
    let mut current = CycleBucket::default();
    let mut phase = CyclePhase::Idle;

    for event in log {
        let (next, boundary) = phase.advance(&event.step, event.status);
        phase = next;
        match boundary {
            Boundary::Before => {
                buckets.push(std::mem::take(&mut current));
                current.events.push(event.clone());
            }
            Boundary::After => {
                current.events.push(event.clone());
                buckets.push(std::mem::take(&mut current));
            }
            Boundary::None => current.events.push(event.clone()),
        }
    }

    if !current.is_empty() {
        buckets.push(current);
    }
    buckets
}

fn reconcile(mut buckets: Vec<CycleBucket>, expected: usize) -> Vec<CycleBucket> {
    if buckets.len() > expected {
        let overflow = buckets.split_off(expected - 1);
        let merged = overflow
            .into_iter()
            .flat_map(|bucket| bucket.events)
            .collect();
        buckets.push(CycleBucket { events: merged });
    }
    buckets.resize_with(expected, CycleBucket::default);
    buckets
}
