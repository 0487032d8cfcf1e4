//! JSON-lines encoding of events for the worker-process boundary.

use super::ProgressEvent;

/// One event per line, no trailing newline.
pub fn encode_event_line(event: &ProgressEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

/// Decodes a line written by `encode_event_line`. Blank or foreign lines
/// (e.g. stray output from a library) yield `None`.
pub fn decode_event_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim();
    if !line.starts_with('{') {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(ev) => Some(ev),
        Err(e) => {
            tracing::debug!("ignoring undecodable worker line: {}", e);
            None
        }
    }
}
