// SPDX-License-Identifier: MIT

use super::*;
use fleet_core::{EventData, Provider};

fn evt(text: &str) -> AgentEvent {
    AgentEvent::new(0, Provider::Docker, EventData::Output { text: text.to_string() })
}

fn text_of(event: &AgentEvent) -> &str {
    match &event.data {
        EventData::Output { text } => text,
        other => panic!("unexpected event data: {other:?}"),
    }
}

#[test]
fn publish_appends_to_history_in_order() {
    let bus = EventBus::new();
    bus.publish(evt("a"));
    bus.publish(evt("b"));
    let history = bus.history();
    assert_eq!(history.len(), 2);
    assert_eq!(text_of(&history[0]), "a");
    assert_eq!(text_of(&history[1]), "b");
}

#[test]
fn late_subscriber_replay_then_live_tail_has_no_gap_or_duplicate() {
    let bus = EventBus::new();
    bus.publish(evt("before-1"));
    bus.publish(evt("before-2"));
    let (_id, replay, mut rx) = bus.subscribe();
    bus.publish(evt("after"));

    assert_eq!(replay.len(), 2);
    assert_eq!(text_of(&replay[0]), "before-1");
    assert_eq!(text_of(&replay[1]), "before-2");

    let live = rx.try_recv().unwrap();
    assert_eq!(text_of(&live), "after");
    assert!(rx.try_recv().is_err());
}

#[test]
fn dropped_subscriber_is_pruned_without_affecting_others() {
    let bus = EventBus::new();
    let (_id_a, _history_a, rx_a) = bus.subscribe();
    let (_id_b, _history_b, mut rx_b) = bus.subscribe();
    drop(rx_a);
    bus.publish(evt("x"));
    assert_eq!(bus.subscriber_count(), 1);
    assert!(rx_b.try_recv().is_ok());
}

#[test]
fn unsubscribe_removes_the_handle() {
    let bus = EventBus::new();
    let (id, _history, _rx) = bus.subscribe();
    bus.unsubscribe(id);
    assert_eq!(bus.subscriber_count(), 0);
}
