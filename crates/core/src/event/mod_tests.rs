// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn distinct_events_get_distinct_ids() {
    let a = AgentEvent::new(1, Provider::Docker, EventData::Output { text: "x".into() });
    let b = AgentEvent::new(1, Provider::Docker, EventData::Output { text: "x".into() });
    assert_ne!(a.id, b.id);
}

#[test]
fn kind_delegates_to_data() {
    let e = AgentEvent::new(0, Provider::Modal, EventData::Complete { message: None });
    assert_eq!(e.kind(), "complete");
}
