//! Live run-progress core.
//!
//! - `log`: append-only, cursor-deduplicating event log
//! - `segment`: cycle boundary state machine and bucket reconciliation
//! - `view`: selected-cycle clamping
//! - `text` / `toolbelt`: pure views over a cycle's events
//! - `refresh`: delayed reload signals for derived run data
//! - `transport`: push channel and polling fallback
//! - `progress`: synchronous state core tying the above together
//! - `session`: tokio actor driving one run

mod log;
mod progress;
mod refresh;
mod segment;
mod session;
mod text;
mod toolbelt;
mod transport;
mod view;

pub use log::EventLog;
pub use progress::{RunProgress, SessionSnapshot};
pub use refresh::{refresh_trigger, AutoRefreshTrigger, RefreshSignal};
pub use segment::{segment, Boundary, CycleBucket, CyclePhase};
pub use session::{spawn_session, SessionCommand, SessionEvents, SessionHandle};
pub use text::assemble_text;
pub use toolbelt::{ToolState, Toolbelt};
pub use transport::{
    PollTick, PollingFallback, StreamConnection, StreamMessage, StreamState, TransportMode,
};
pub use view::ViewSelector;
