// SPDX-License-Identifier: MIT

//! `fleet stop` — `POST /run/{id}/stop` (spec 6).

use clap::Args;

use crate::client::FleetClient;
use crate::output::{format_or_json, OutputFormat};

#[derive(Debug, Args)]
pub struct StopArgs {
    run_id: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

pub async fn handle(client: &FleetClient, args: StopArgs) -> anyhow::Result<()> {
    let response = client.stop_run(&args.run_id).await?;

    format_or_json(args.output, &response, || {
        println!("Run {} stopped", args.run_id);
        for provider in &response.providers {
            let verb = if provider.destroyed { "destroyed" } else { "destroy not confirmed" };
            println!("  {} sandbox {verb}", provider.provider.as_str());
        }
    })
}
