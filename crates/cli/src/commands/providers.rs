// SPDX-License-Identifier: MIT

//! `fleet providers` — `GET /providers` (spec 6).

use clap::Args;

use crate::client::FleetClient;
use crate::output::{format_or_json, OutputFormat};

#[derive(Debug, Args)]
pub struct ProvidersArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

pub async fn handle(client: &FleetClient, args: ProvidersArgs) -> anyhow::Result<()> {
    let response = client.providers().await?;

    format_or_json(args.output, &response, || {
        for entry in &response.providers {
            let flag = if entry.configured { "configured" } else { "unconfigured" };
            println!("{:<8} {flag}", entry.provider.as_str());
        }
    })
}
