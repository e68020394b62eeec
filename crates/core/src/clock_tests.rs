// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let t0 = clock.now();
    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.now(), t0 + Duration::from_secs(5));
}

#[test]
fn fake_clock_epoch_advances_with_duration() {
    let clock = FakeClock::new();
    let e0 = clock.epoch_ms();
    clock.advance(Duration::from_millis(250));
    assert_eq!(clock.epoch_ms(), e0 + 250);
}
