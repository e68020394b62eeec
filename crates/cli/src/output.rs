// SPDX-License-Identifier: MIT

//! Text/JSON output formatting shared across commands, grounded in the
//! teacher's own `cli::output::format_or_json` branch-on-format helper.

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Renders as pretty JSON when `format` is [`OutputFormat::Json`], otherwise
/// runs `text_fn`.
pub fn format_or_json<T: Serialize>(
    format: OutputFormat,
    data: &T,
    text_fn: impl FnOnce(),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
        OutputFormat::Text => text_fn(),
    }
    Ok(())
}
