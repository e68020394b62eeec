// SPDX-License-Identifier: MIT

//! Minimal server-sent-events line parser for the Agent Client's event
//! stream (spec 4.3). Frames are `data: <json>\n\n`; `event:`/`id:` lines
//! and blank keep-alive comments (`: ping`) are tolerated and ignored
//! beyond marking a boundary.

#[derive(Debug, Clone, Default)]
pub struct SseFrameBuilder {
    data_lines: Vec<String>,
}

impl SseFrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without trailing newline). Returns `Some(payload)`
    /// when a blank line completes a frame with at least one `data:` line.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data_lines.is_empty() {
                return None;
            }
            let payload = self.data_lines.join("\n");
            self.data_lines.clear();
            return Some(payload);
        }
        if let Some(rest) = line.strip_prefix("data:") {
            self.data_lines.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        // `event:`, `id:`, `retry:`, and `:`-comments carry no information
        // this client needs; the frame's `type` is embedded in its JSON body.
        None
    }
}

/// Splits a raw byte chunk into complete lines plus a carry-over remainder,
/// for use against `reqwest::Response::bytes_stream()` chunks that may
/// split a line across TCP segments.
pub fn split_lines(buffer: &mut String, chunk: &str) -> Vec<String> {
    buffer.push_str(chunk);
    let mut lines = Vec::new();
    while let Some(idx) = buffer.find('\n') {
        let mut line: String = buffer.drain(..=idx).collect();
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
#[path = "sse_tests.rs"]
mod tests;
