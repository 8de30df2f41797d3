//! Append-only event accumulator for one viewing session.

use crate::types::{Event, Timestamp};

/// Ordered, append-only log of run events.
///
/// The cursor is the greatest `created_at` held. Pull-mode appends only
/// accept events strictly newer than the cursor; push-mode appends keep
/// arrival order.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
    cursor: Option<Timestamp>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append events from the push channel in arrival order.
    ///
    /// Returns the delta, which is every event passed in.
    pub fn append_pushed(&mut self, events: impl IntoIterator<Item = Event>) -> &[Event] {
        let start = self.events.len();
        for event in events {
            self.advance_cursor(&event.created_at);
            self.events.push(event);
        }
        &self.events[start..]
    }

    /// Append entries of a full poll listing that are newer than the cursor.
    pub fn append_polled(&mut self, events: impl IntoIterator<Item = Event>) -> &[Event] {
        let start = self.events.len();
        let threshold = self.cursor.clone();
        for event in events {
            if threshold
                .as_ref()
                .is_some_and(|cursor| event.created_at <= *cursor)
            {
                continue;
            }
            self.advance_cursor(&event.created_at);
            self.events.push(event);
        }
        &self.events[start..]
    }

    fn advance_cursor(&mut self, at: &Timestamp) {
        if self.cursor.as_ref().map_or(true, |cursor| at > cursor) {
            self.cursor = Some(at.clone());
        }
    }

    pub fn cursor(&self) -> Option<&Timestamp> {
        self.cursor.as_ref()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
