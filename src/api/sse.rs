//! Incremental SSE decoder for the run push channel.

use std::collections::VecDeque;

/// Decode a byte stream into concatenated `data` payload blocks.
///
/// The SSE format allows events to contain multiple `data:` lines; payload
/// lines are joined with `\n` and finalized when a blank line is encountered.
/// Bytes are buffered until a full line is available so UTF-8 sequences split
/// across network chunks decode correctly.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    pending: Vec<u8>,
    data_lines: Vec<String>,
    ready: VecDeque<String>,
}

impl SseDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk.
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned();
            self.handle_line(&line);
        }
    }

    /// Next completed payload, in arrival order.
    pub(crate) fn next_payload(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    /// Flush a trailing event that was not followed by a blank line.
    pub(crate) fn finish(&mut self) {
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&raw).into_owned();
            self.handle_line(&line);
        }
        self.flush_event();
    }

    fn handle_line(&mut self, raw_line: &str) {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.is_empty() {
            self.flush_event();
            return;
        }
        // Comment lines carry server keep-alives.
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data_lines.push(value.to_string());
        }
    }

    fn flush_event(&mut self) {
        if self.data_lines.is_empty() {
            return;
        }
        self.ready.push_back(self.data_lines.join("\n"));
        self.data_lines.clear();
    }
}
