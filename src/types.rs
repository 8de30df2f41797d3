//! Data model for run execution events and run metadata.
//!
//! These types deserialize directly from the JSON payloads served by the run
//! backend (`/runs/{id}`, `/runs/{id}/events`, `/runs/{id}/report` and the
//! SSE stream).

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Steps and statuses
// ---------------------------------------------------------------------------

/// Execution step an event reports on.
///
/// Tags are matched case-insensitively. Unknown tags are preserved in
/// [`Step::Other`] so the log never loses events the backend adds later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Step {
    Queued,
    /// Effective engine options, JSON-encoded in the message.
    Opts,
    /// Engine request for one cycle.
    Fetch,
    Parse,
    /// A fragment of the streamed answer text.
    Chunk,
    Persist,
    Extract,
    /// Cooldown between two cycles.
    Delay,
    Screenshot,
    Completed,
    Error,
    Other(String),
}

impl Step {
    /// Wire tag for this step.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Opts => "opts",
            Self::Fetch => "fetch",
            Self::Parse => "parse",
            Self::Chunk => "chunk",
            Self::Persist => "persist",
            Self::Extract => "extract",
            Self::Delay => "delay",
            Self::Screenshot => "screenshot",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for Step {
    fn from(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "queued" => Self::Queued,
            "opts" => Self::Opts,
            "fetch" => Self::Fetch,
            "parse" => Self::Parse,
            "chunk" => Self::Chunk,
            "persist" => Self::Persist,
            "extract" => Self::Extract,
            "delay" => Self::Delay,
            "screenshot" => Self::Screenshot,
            "completed" => Self::Completed,
            "error" => Self::Error,
            _ => Self::Other(tag.to_string()),
        }
    }
}

impl From<String> for Step {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<Step> for String {
    fn from(step: Step) -> Self {
        match step {
            Step::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome reported by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Started,
    Ok,
    /// Also accepts the backend's `fail` spelling.
    Error,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }

    /// Parse a status tag, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "started" => Some(Self::Started),
            "ok" => Some(Self::Ok),
            "error" | "fail" => Some(Self::Error),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for EventStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| de::Error::custom(format!("unknown event status `{raw}`")))
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// ISO-8601 creation timestamp as emitted by the backend.
///
/// Ordering is lexicographic on the raw text, which matches chronological
/// order for the single fixed-width format the backend writes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// One status notification about a step of run execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub step: Step,
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: Timestamp,
}

impl Event {
    /// Create an event without a message.
    pub fn new(step: Step, status: EventStatus, created_at: impl Into<String>) -> Self {
        Self {
            step,
            status,
            message: None,
            created_at: Timestamp::new(created_at),
        }
    }

    /// Attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Decode one JSON event payload.
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Answer text carried by a `chunk` event.
    pub fn chunk_text(&self) -> Option<&str> {
        match self.step {
            Step::Chunk => self.message.as_deref(),
            _ => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == EventStatus::Ok
    }
}

// ---------------------------------------------------------------------------
// Run metadata and report
// ---------------------------------------------------------------------------

/// Engine a run executed against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineInfo {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
}

/// Run metadata served by `GET /runs/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDetail {
    pub id: String,
    pub project_id: Option<String>,
    pub status: String,
    pub engine: EngineInfo,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub prompt_text: Option<String>,
    pub model_name: Option<String>,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
    pub tokens_total: Option<u64>,
    pub cost_usd: Option<f64>,
    pub latency_ms: Option<u64>,
    /// Number of execution cycles the run was enqueued with.
    pub cycles_total: Option<u32>,
}

/// One cited source in a run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub domain: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub anchor: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_ours: bool,
}

/// Citation metrics served by `GET /runs/{id}/report`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunReport {
    pub id: String,
    pub amr: f64,
    pub dcr: f64,
    pub zcrs: f64,
    pub citations: Vec<Citation>,
}

impl RunReport {
    /// Citations pointing at the monitored domain.
    pub fn own_citations(&self) -> usize {
        self.citations.iter().filter(|c| c.is_ours).count()
    }
}
