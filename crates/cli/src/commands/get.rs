// SPDX-License-Identifier: MIT

//! `fleet get` — `GET /run/{id}` (spec 6).

use clap::Args;

use crate::client::FleetClient;
use crate::color;
use crate::output::{format_or_json, OutputFormat};

#[derive(Debug, Args)]
pub struct GetArgs {
    run_id: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

pub async fn handle(client: &FleetClient, args: GetArgs) -> anyhow::Result<()> {
    let snapshot = client.get_run(&args.run_id).await?;

    format_or_json(args.output, &snapshot, || {
        println!(
            "{}  {}  {}",
            color::header(snapshot.run_id.as_str()),
            snapshot.repo,
            snapshot.status
        );
        println!("  branch: {}  task: {}", snapshot.branch, snapshot.task);
        for provider in &snapshot.providers {
            let sandbox = provider.sandbox_id.as_deref().unwrap_or("-");
            println!(
                "  {:<8} {:<10} sandbox={} events={}",
                provider.provider.as_str(),
                provider.status.to_string(),
                sandbox,
                provider.event_count
            );
            if let Some(reason) = &provider.failure_reason {
                println!("    {}", color::error(reason));
            }
        }
    })
}
