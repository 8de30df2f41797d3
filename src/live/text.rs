//! Streamed answer text derived from `chunk` events.

use crate::types::Event;

/// Join the chunk messages of `bucket` with newlines.
///
/// An empty bucket falls back to the whole log so the first cycle shows text
/// before any boundary has been seen.
pub fn assemble_text(bucket: &[Event], full_log: &[Event]) -> String {
    let source = if bucket.is_empty() { full_log } else { bucket };
    source
        .iter()
        .filter_map(Event::chunk_text)
        .collect::<Vec<_>>()
        .join("\n")
}
