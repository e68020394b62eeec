// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn new_client_retains_provider_and_base_url() {
    let c = AgentClient::new("http://localhost:8080", Provider::Docker);
    assert_eq!(c.provider(), Provider::Docker);
    assert_eq!(c.base_url, "http://localhost:8080");
}
