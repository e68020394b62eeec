// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn appends_text_once_role_resolves_to_assistant() {
    let mut t = RoleTracker::new();
    t.observe_text("m1", "hello ");
    t.observe_role("m1", "assistant");
    t.observe_text("m1", "world");
    assert_eq!(t.assistant_text(), "hello world");
}

#[test]
fn discards_text_once_role_resolves_to_user() {
    let mut t = RoleTracker::new();
    t.observe_text("m1", "<promise>DONE_abcdef01</promise>");
    t.observe_role("m1", "user");
    assert_eq!(t.assistant_text(), "");
}

#[test]
fn immediate_append_when_role_already_known() {
    let mut t = RoleTracker::new();
    t.observe_role("m1", "assistant");
    t.observe_text("m1", "done");
    assert_eq!(t.assistant_text(), "done");
}

#[test]
fn reset_clears_accumulated_text() {
    let mut t = RoleTracker::new();
    t.observe_role("m1", "assistant");
    t.observe_text("m1", "done");
    t.reset();
    assert_eq!(t.assistant_text(), "");
}

#[test]
fn build_prompt_embeds_marker_and_task() {
    let prompt = build_iteration_prompt("fix the bug", "DONE_abcdef01");
    assert!(prompt.contains("fix the bug"));
    assert!(prompt.contains("<promise>DONE_abcdef01</promise>"));
}

#[test]
fn record_message_parts_emits_thought_for_assistant_text() {
    let sink = crate::sink::test_support::RecordingSink::new();
    let mut tracker = RoleTracker::new();
    let parts = vec![ChatPart::Text { role: Some("assistant".into()), text: "working on it".into() }];
    record_message_parts("m1", "assistant", &parts, &mut tracker, &sink);
    assert_eq!(tracker.assistant_text(), "working on it");
    assert_eq!(sink.events(), vec![EventData::Thought { text: "working on it".into() }]);
}

#[test]
fn record_message_parts_skips_thought_for_user_text() {
    let sink = crate::sink::test_support::RecordingSink::new();
    let mut tracker = RoleTracker::new();
    let parts = vec![ChatPart::Text { role: Some("user".into()), text: "do the thing".into() }];
    record_message_parts("m1", "assistant", &parts, &mut tracker, &sink);
    assert_eq!(tracker.assistant_text(), "");
    assert!(sink.events().is_empty());
}

#[test]
fn record_message_parts_emits_tool_call_only_when_completed() {
    let sink = crate::sink::test_support::RecordingSink::new();
    let mut tracker = RoleTracker::new();
    let running = vec![ChatPart::Tool {
        name: "bash".into(),
        title: Some("run tests".into()),
        state: Some(serde_json::json!({"status": "running"})),
    }];
    record_message_parts("m1", "assistant", &running, &mut tracker, &sink);
    assert!(sink.events().is_empty());

    let completed = vec![ChatPart::Tool {
        name: "bash".into(),
        title: Some("run tests".into()),
        state: Some(serde_json::json!({"status": "completed", "output": "ok"})),
    }];
    record_message_parts("m1", "assistant", &completed, &mut tracker, &sink);
    assert_eq!(sink.events().len(), 1);
    match &sink.events()[0] {
        EventData::ToolCall { name, state, .. } => {
            assert_eq!(name, "bash");
            assert_eq!(state.status, "completed");
        }
        other => panic!("expected ToolCall, got {other:?}"),
    }
}

#[test]
fn heartbeat_events_are_recognized() {
    let event = ServerEvent { raw: serde_json::json!({"type": "server.heartbeat"}) };
    assert!(is_heartbeat(&event));
    let event = ServerEvent { raw: serde_json::json!({"type": "heartbeat"}) };
    assert!(is_heartbeat(&event));
    let event = ServerEvent { raw: serde_json::json!({"type": "message.updated"}) };
    assert!(!is_heartbeat(&event));
}

#[test]
fn session_error_events_are_recognized() {
    let event = ServerEvent { raw: serde_json::json!({"type": "session.error"}) };
    assert!(is_session_error(&event));
    let event = ServerEvent { raw: serde_json::json!({"type": "message.updated"}) };
    assert!(!is_session_error(&event));
}

#[test]
fn handle_event_resolves_role_from_message_updated() {
    let mut tracker = RoleTracker::new();
    let sink = crate::sink::test_support::RecordingSink::new();
    tracker.observe_text("m1", "hello");
    let event = ServerEvent {
        raw: serde_json::json!({"type": "message.updated", "properties": {"id": "m1", "role": "assistant"}}),
    };
    handle_event(&event, &mut tracker, &sink);
    assert_eq!(tracker.assistant_text(), "hello");
}

#[test]
fn handle_event_appends_text_part() {
    let mut tracker = RoleTracker::new();
    let sink = crate::sink::test_support::RecordingSink::new();
    tracker.observe_role("m1", "assistant");
    let event = ServerEvent {
        raw: serde_json::json!({"type": "message.part.updated", "properties": {"messageID": "m1", "text": "done soon"}}),
    };
    handle_event(&event, &mut tracker, &sink);
    assert_eq!(tracker.assistant_text(), "done soon");
}

#[test]
fn handle_event_emits_tool_call_only_when_completed() {
    let mut tracker = RoleTracker::new();
    let sink = crate::sink::test_support::RecordingSink::new();
    let running = ServerEvent {
        raw: serde_json::json!({
            "type": "message.part.updated",
            "properties": {
                "messageID": "m1",
                "tool": {"name": "bash", "title": "run"},
                "state": {"status": "running"}
            }
        }),
    };
    handle_event(&running, &mut tracker, &sink);
    assert!(sink.events().is_empty());

    let completed = ServerEvent {
        raw: serde_json::json!({
            "type": "message.part.updated",
            "properties": {
                "messageID": "m1",
                "tool": {"name": "bash", "title": "run"},
                "state": {"status": "completed", "output": "ok"}
            }
        }),
    };
    handle_event(&completed, &mut tracker, &sink);
    assert_eq!(sink.events().len(), 1);
}

#[test]
fn session_scoped_event_with_matching_id_is_kept() {
    let event = ServerEvent {
        raw: serde_json::json!({"type": "message.updated", "properties": {"sessionID": "sess-1", "id": "m1", "role": "assistant"}}),
    };
    assert_eq!(event.session_id(), Some("sess-1"));
}
