// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn plain_text_unchanged_without_color() {
    std::env::set_var("NO_COLOR", "1");
    assert_eq!(header("x"), "x");
    assert_eq!(muted("x"), "x");
    std::env::remove_var("NO_COLOR");
}
