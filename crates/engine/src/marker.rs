// SPDX-License-Identifier: MIT

//! Completion-marker generation and detection (spec 4.5).
//!
//! Every run gets a fresh random marker so an agent paraphrasing its own
//! instructions back at us can't accidentally trip completion detection.
//! Detection strips fenced/inline code first so a marker merely *discussed*
//! in a code block never counts (Testable Property 4).

use regex::Regex;
use std::sync::LazyLock;

const MARKER_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Generates a fresh `DONE_<8 lowercase-alphanumeric>` marker for one run.
pub fn generate_marker() -> String {
    format!("DONE_{}", nanoid::nanoid!(8, &MARKER_ALPHABET))
}

#[allow(clippy::expect_used)]
static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static INLINE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]*`").expect("constant regex pattern is valid"));

/// Strips fenced code blocks (```` ``` ````...```` ``` ````, including a
/// language tag on the opening fence) and inline code spans (`` ` ``...`` `
/// ``) from `text`, in that order. Used before marker detection so a marker
/// appearing only inside code never counts (spec 4.5, Testable Property 4).
pub fn strip_code(text: &str) -> String {
    let without_fences = FENCED_BLOCK.replace_all(text, "");
    INLINE_SPAN.replace_all(&without_fences, "").into_owned()
}

fn marker_pattern(marker: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?im)^\s*<promise>\s*{}\s*</promise>\s*$", regex::escape(marker))).ok()
}

/// Returns whether `marker` appears as `<promise>MARKER</promise>` alone on
/// a line in `text` (case-insensitive), after stripping fenced/inline code.
///
/// Callers are expected to have already restricted `text` to accumulated
/// **assistant**-role content — this function performs no role filtering of
/// its own (that discipline lives in [`crate::iteration::RoleTracker`]).
pub fn contains_marker(text: &str, marker: &str) -> bool {
    let stripped = strip_code(text);
    match marker_pattern(marker) {
        Some(re) => re.is_match(&stripped),
        None => false,
    }
}

#[cfg(test)]
#[path = "marker_tests.rs"]
mod tests;
