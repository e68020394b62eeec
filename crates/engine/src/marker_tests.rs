// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn generated_marker_matches_grammar() {
    let marker = generate_marker();
    assert!(marker.starts_with("DONE_"));
    let suffix = &marker["DONE_".len()..];
    assert_eq!(suffix.len(), 8);
    assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
}

#[test]
fn two_generated_markers_differ() {
    assert_ne!(generate_marker(), generate_marker());
}

#[test]
fn detects_marker_on_its_own_line() {
    let text = "I finished the task.\n<promise>DONE_abcdef01</promise>\n";
    assert!(contains_marker(text, "DONE_abcdef01"));
}

#[test]
fn detection_is_case_insensitive() {
    let text = "<PROMISE>done_abcdef01</PROMISE>";
    assert!(contains_marker(text, "DONE_abcdef01"));
}

#[test]
fn tolerates_surrounding_whitespace() {
    let text = "  <promise> DONE_abcdef01 </promise>  \n";
    assert!(contains_marker(text, "DONE_abcdef01"));
}

#[test]
fn ignores_marker_inside_fenced_code_block() {
    let text = "```\n<promise>DONE_abcdef01</promise>\n```\nStill working on it.";
    assert!(!contains_marker(text, "DONE_abcdef01"));
}

#[test]
fn ignores_marker_inside_inline_code_span() {
    let text = "The marker looks like `<promise>DONE_abcdef01</promise>`.";
    assert!(!contains_marker(text, "DONE_abcdef01"));
}

#[test]
fn ignores_marker_with_trailing_prose_on_same_line() {
    let text = "<promise>DONE_abcdef01</promise> done!";
    assert!(!contains_marker(text, "DONE_abcdef01"));
}

#[test]
fn rejects_wrong_marker() {
    let text = "<promise>DONE_zzzzzzzz</promise>";
    assert!(!contains_marker(text, "DONE_abcdef01"));
}

#[test]
fn marker_survives_after_stripping_an_unrelated_fence() {
    let text = "```rust\nfn x() {}\n```\n<promise>DONE_abcdef01</promise>";
    assert!(contains_marker(text, "DONE_abcdef01"));
}
