// SPDX-License-Identifier: MIT

//! `fleet run` — `POST /run` (spec 6).

use clap::Args;
use fleet_wire::{RunConfigInput, StartRunRequest};

use crate::client::FleetClient;
use crate::color;
use crate::output::{format_or_json, OutputFormat};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// `owner/repo` shorthand or a full GitHub URL.
    #[arg(long)]
    repo: String,

    /// Branch to check out. Defaults to `main` on the daemon side.
    #[arg(long)]
    branch: Option<String>,

    /// Natural-language task for the agent to complete.
    #[arg(long)]
    task: String,

    /// Provider to dispatch to; repeat for multiple providers.
    #[arg(long = "provider", required = true)]
    providers: Vec<String>,

    #[arg(long)]
    max_iterations: Option<u32>,

    #[arg(long)]
    idle_timeout_ms: Option<u64>,

    /// Use the blocking-chat iteration engine instead of the SSE-driven one.
    #[arg(long)]
    no_sse: bool,

    #[arg(long)]
    user_id: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

pub async fn handle(client: &FleetClient, args: RunArgs) -> anyhow::Result<()> {
    let request = StartRunRequest {
        repo_url: args.repo,
        branch: args.branch,
        task: args.task,
        providers: args.providers,
        config: Some(RunConfigInput {
            max_iterations: args.max_iterations,
            idle_timeout_ms: args.idle_timeout_ms,
            use_sse: Some(!args.no_sse),
        }),
        user_id: args.user_id,
    };

    let response = client.start_run(&request).await?;

    format_or_json(args.output, &response, || {
        println!("Run {} started", color::header(response.run_id.as_str()));
        for provider in &response.providers {
            if provider.success {
                println!("  {} prepared", color::muted(provider.provider.as_str()));
            } else {
                println!(
                    "  {} failed: {}",
                    color::header(provider.provider.as_str()),
                    provider.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    })
}
