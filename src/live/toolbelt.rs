//! Per-tool activity derived from the event stream.

use crate::types::{Event, EventStatus, Step};
use std::fmt;

/// Activity of one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolState {
    #[default]
    Idle,
    Started,
    Ok,
    Error,
}

impl From<EventStatus> for ToolState {
    fn from(status: EventStatus) -> Self {
        match status {
            EventStatus::Started => Self::Started,
            EventStatus::Ok => Self::Ok,
            EventStatus::Error => Self::Error,
        }
    }
}

impl fmt::Display for ToolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Started => "started",
            Self::Ok => "ok",
            Self::Error => "error",
        })
    }
}

/// Latest state of the LLM, search, SERP and screenshot tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Toolbelt {
    pub llm: ToolState,
    pub search: ToolState,
    pub serp: ToolState,
    pub screenshot: ToolState,
}

impl Toolbelt {
    /// Fold events in order; the last event per tool wins.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut belt = Self::default();
        for event in events {
            let slot = match event.step {
                Step::Fetch => &mut belt.llm,
                Step::Extract => &mut belt.search,
                Step::Persist => &mut belt.serp,
                Step::Screenshot => &mut belt.screenshot,
                _ => continue,
            };
            *slot = event.status.into();
        }
        belt
    }

    /// `(label, state)` pairs in display order.
    pub fn entries(&self) -> [(&'static str, ToolState); 4] {
        [
            ("LLM", self.llm),
            ("Search", self.search),
            ("SERP", self.serp),
            ("Screenshot", self.screenshot),
        ]
    }
}
