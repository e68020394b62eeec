// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn single_data_line_completes_on_blank() {
    let mut b = SseFrameBuilder::new();
    assert_eq!(b.push_line("data: {\"type\":\"output\"}"), None);
    assert_eq!(b.push_line(""), Some("{\"type\":\"output\"}".to_string()));
}

#[test]
fn multi_line_data_is_joined_with_newline() {
    let mut b = SseFrameBuilder::new();
    b.push_line("data: line one");
    b.push_line("data: line two");
    assert_eq!(b.push_line(""), Some("line one\nline two".to_string()));
}

#[test]
fn comment_and_event_lines_are_ignored() {
    let mut b = SseFrameBuilder::new();
    assert_eq!(b.push_line(": ping"), None);
    assert_eq!(b.push_line("event: message"), None);
    assert_eq!(b.push_line(""), None);
}

#[test]
fn split_lines_handles_chunk_boundaries_mid_line() {
    let mut buf = String::new();
    let mut lines = split_lines(&mut buf, "data: foo");
    assert!(lines.is_empty());
    lines = split_lines(&mut buf, "bar\ndata: baz\n");
    assert_eq!(lines, vec!["data: foobar".to_string(), "data: baz".to_string()]);
}

#[test]
fn split_lines_strips_crlf() {
    let mut buf = String::new();
    let lines = split_lines(&mut buf, "data: x\r\n");
    assert_eq!(lines, vec!["data: x".to_string()]);
}
