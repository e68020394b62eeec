// SPDX-License-Identifier: MIT

//! Terminal color helpers, grounded in the teacher's own `cli::color`
//! (ANSI-256 palette gated on `NO_COLOR`/`COLOR`/TTY detection), trimmed to
//! the handful of roles this CLI actually uses.

use clap::builder::styling::{Ansi256Color, Color, Style, Styles};
use std::io::IsTerminal;

mod codes {
    pub const HEADER: u8 = 74;
    pub const MUTED: u8 = 240;
    pub const ERROR: u8 = 203;
}

/// Priority: `NO_COLOR=1` disables, `COLOR=1` forces, otherwise TTY check.
pub fn should_colorize() -> bool {
    if std::env::var("NO_COLOR").is_ok_and(|v| v == "1") {
        return false;
    }
    if std::env::var("COLOR").is_ok_and(|v| v == "1") {
        return true;
    }
    std::io::stdout().is_terminal()
}

pub fn styles() -> Styles {
    if !should_colorize() {
        return Styles::plain();
    }
    Styles::styled().header(Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(codes::HEADER)))))
}

fn fg256(code: u8, text: &str) -> String {
    if should_colorize() {
        format!("\x1b[38;5;{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

pub fn header(text: &str) -> String {
    fg256(codes::HEADER, text)
}

pub fn muted(text: &str) -> String {
    fg256(codes::MUTED, text)
}

pub fn error(text: &str) -> String {
    fg256(codes::ERROR, text)
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
