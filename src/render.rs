//! Terminal output for live sessions and one-shot listings.
//!
//! Frames are built as strings first so layout is testable without a
//! terminal; [`Renderer::draw`] is the only place that touches stdout.

use crate::live::{CycleBucket, SessionSnapshot, ToolState, TransportMode};
use crate::types::{Event, EventStatus, RunDetail, RunReport};
use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Stylize};
use crossterm::terminal::{Clear, ClearType};
use crossterm::QueueableCommand;
use std::fmt::Write as _;
use std::io::{self, Write};

const INDENT: &str = "  ";
const MESSAGE_PREVIEW_CHARS: usize = 96;

/// Handles all terminal output formatting.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).bold().to_string()
        } else {
            text.to_string()
        }
    }

    // -- frames ---------------------------------------------------------

    /// Full live frame for one snapshot.
    pub fn snapshot_frame(
        &self,
        snap: &SessionSnapshot,
        detail: Option<&RunDetail>,
        report: Option<&RunReport>,
        max_events: usize,
    ) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {}  {}",
            self.bold("run", Color::Cyan),
            snap.run_id,
            self.mode_badge(snap.mode)
        );
        if let Some(detail) = detail {
            out.push_str(&self.detail_lines(detail));
        }

        let _ = writeln!(
            out,
            "{}",
            self.cycle_tabs(snap.expected_total_cycles, snap.selected_cycle)
        );
        let tools = snap
            .toolbelt
            .entries()
            .iter()
            .map(|(label, state)| format!("{label} {}", self.tool_state(*state)))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "{INDENT}{tools}");

        let view: &[Event] = if snap.events_for_view.is_empty() {
            &snap.events
        } else {
            &snap.events_for_view
        };
        let _ = writeln!(
            out,
            "{} ({})",
            self.bold("Progress", Color::White),
            view.len()
        );
        out.push_str(&self.event_lines(view, max_events));

        if !snap.streamed_text.is_empty() {
            let _ = writeln!(out, "{}", self.bold("Answer", Color::White));
            for line in snap.streamed_text.lines() {
                let _ = writeln!(out, "{INDENT}{line}");
            }
        }
        if let Some(report) = report {
            out.push_str(&self.report_lines(report));
        }
        out
    }

    /// One-shot listing of every cycle.
    pub fn cycles_listing(&self, run_id: &str, buckets: &[CycleBucket], max_events: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {run_id}", self.bold("run", Color::Cyan));
        for (index, bucket) in buckets.iter().enumerate() {
            let _ = writeln!(
                out,
                "{} ({} events)",
                self.bold(&format!("Cycle {}", index + 1), Color::White),
                bucket.len()
            );
            out.push_str(&self.event_lines(&bucket.events, max_events));
        }
        out
    }

    fn mode_badge(&self, mode: TransportMode) -> String {
        let color = match mode {
            TransportMode::Connecting => Color::DarkGrey,
            TransportMode::Push => Color::Green,
            TransportMode::Poll => Color::Yellow,
            TransportMode::Stopped => Color::Red,
        };
        self.paint(&format!("[{mode}]"), color)
    }

    fn cycle_tabs(&self, total: usize, selected: usize) -> String {
        let tabs = (1..=total)
            .map(|n| {
                if n == selected {
                    self.bold(&format!("[{n}]"), Color::Cyan)
                } else {
                    format!(" {n} ")
                }
            })
            .collect::<String>();
        format!("Cycle {selected}/{total} {tabs}")
    }

    fn tool_state(&self, state: ToolState) -> String {
        let color = match state {
            ToolState::Idle => Color::DarkGrey,
            ToolState::Started => Color::Yellow,
            ToolState::Ok => Color::Green,
            ToolState::Error => Color::Red,
        };
        self.paint(&state.to_string(), color)
    }

    fn event_lines(&self, events: &[Event], max_events: usize) -> String {
        let mut out = String::new();
        let skip = events.len().saturating_sub(max_events.max(1));
        if skip > 0 {
            let _ = writeln!(
                out,
                "{INDENT}{}",
                self.paint(&format!("… {skip} earlier events"), Color::DarkGrey)
            );
        }
        for event in &events[skip..] {
            let status_color = match event.status {
                EventStatus::Started => Color::Yellow,
                EventStatus::Ok => Color::Green,
                EventStatus::Error => Color::Red,
            };
            let mut line = format!(
                "{INDENT}{} {:<10} {}",
                self.paint(event.created_at.as_str(), Color::DarkGrey),
                event.step.as_str(),
                self.paint(event.status.as_str(), status_color)
            );
            if let Some(message) = event.message.as_deref() {
                let _ = write!(line, " {}", preview(message, MESSAGE_PREVIEW_CHARS));
            }
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    fn detail_lines(&self, detail: &RunDetail) -> String {
        let mut out = String::new();
        let mut field = |key: &str, value: String| {
            let _ = writeln!(out, "{INDENT}{} {value}", self.paint(&format!("{key}:"), Color::DarkGrey));
        };
        field("status", detail.status.clone());
        if !detail.engine.name.is_empty() {
            field("engine", detail.engine.name.clone());
        }
        if let Some(model) = &detail.model_name {
            field("model", model.clone());
        }
        if let Some(total) = detail.tokens_total {
            field("tokens", total.to_string());
        }
        if let Some(cost) = detail.cost_usd {
            field("cost", format!("${cost:.4}"));
        }
        if let Some(latency) = detail.latency_ms {
            field("latency", format!("{latency} ms"));
        }
        out
    }

    /// KPI and citation summary.
    pub fn report_lines(&self, report: &RunReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.bold("Report", Color::White));
        let _ = writeln!(
            out,
            "{INDENT}AMR {:.2}  DCR {:.2}  ZCRS {:.2}  citations {} (ours {})",
            report.amr,
            report.dcr,
            report.zcrs,
            report.citations.len(),
            report.own_citations()
        );
        out
    }

    // -- output ---------------------------------------------------------

    /// Replace the visible frame on stdout.
    pub fn draw(&self, frame: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        if self.color {
            stdout.queue(Clear(ClearType::All))?.queue(MoveTo(0, 0))?;
        } else {
            writeln!(stdout, "----")?;
        }
        stdout.write_all(frame.as_bytes())?;
        stdout.flush()
    }

    /// Print a warning (to stderr).
    pub fn warn(&self, msg: &str) {
        eprintln!("{} {msg}", self.bold("warning:", Color::Yellow));
    }

    /// Print an error (to stderr).
    pub fn error(&self, msg: &str) {
        eprintln!("{} {msg}", self.bold("error:", Color::Red));
    }
}

/// First line of `text`, cut to `max` characters.
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() <= max {
        return line.to_string();
    }
    let mut cut: String = line.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
