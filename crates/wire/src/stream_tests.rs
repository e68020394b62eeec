// SPDX-License-Identifier: MIT

use super::*;
use fleet_core::EventData;

#[test]
fn from_event_carries_kind_as_type() {
    let event = AgentEvent::new(42, Provider::Docker, EventData::Output { text: "hi".into() });
    let frame = StreamFrame::from_event(&event);
    assert_eq!(frame.frame_type, "output");
    assert_eq!(frame.timestamp, 42);
    assert_eq!(frame.data["text"], "hi");
}

#[test]
fn ping_is_never_confused_with_a_real_frame() {
    let ping = StreamFrame::ping(Provider::Modal, 1);
    assert!(ping.is_ping());
    let event = AgentEvent::new(1, Provider::Modal, EventData::Complete { message: None });
    assert!(!StreamFrame::from_event(&event).is_ping());
}
