// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn serializes_with_type_tag() {
    let data = EventData::RalphIteration { iteration: 1, max_iterations: 10 };
    let json = serde_json::to_value(&data).unwrap();
    assert_eq!(json["type"], "ralph_iteration");
    assert_eq!(json["iteration"], 1);
}

#[test]
fn kind_matches_wire_tag() {
    let data = EventData::Thought { text: "hi".into() };
    let json = serde_json::to_value(&data).unwrap();
    assert_eq!(json["type"], data.kind());
}
