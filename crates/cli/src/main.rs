// SPDX-License-Identifier: MIT

//! `fleet`: the thin CLI front-end for `fleetd`'s Control API (spec 6).
//!
//! Grounded in the teacher's `oj` binary shape (clap derive, one module per
//! command, `ExitError` carrying the process exit code) but talking HTTP to
//! a daemon rather than a Unix-socket RPC, since that is what spec 6
//! actually specifies.

mod client;
mod color;
mod commands;
mod exit_error;
mod output;

use clap::Parser;
use client::FleetClient;
use exit_error::ExitError;

const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:8420";

#[derive(Debug, Parser)]
#[command(name = "fleet", version, about = "Multi-provider agent-execution orchestrator", styles = color::styles())]
struct Cli {
    /// Base URL of the `fleetd` Control API.
    #[arg(long, global = true, env = "FLEET_DAEMON_URL", default_value = DEFAULT_DAEMON_URL)]
    daemon_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Start a run across one or more providers.
    Run(commands::run::RunArgs),
    /// Fetch a run's current snapshot.
    Get(commands::get::GetArgs),
    /// Tear down every sandbox for a run and mark it terminal.
    Stop(commands::stop::StopArgs),
    /// Stream a run's event history, then its live tail.
    Stream(commands::stream::StreamArgs),
    /// List configured/unconfigured providers.
    Providers(commands::providers::ProvidersArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = FleetClient::new(cli.daemon_url);

    let result = match cli.command {
        Command::Run(args) => commands::run::handle(&client, args).await,
        Command::Get(args) => commands::get::handle(&client, args).await,
        Command::Stop(args) => commands::stop::handle(&client, args).await,
        Command::Stream(args) => commands::stream::handle(&client, args).await,
        Command::Providers(args) => commands::providers::handle(&client, args).await,
    };

    if let Err(err) = result {
        let exit = err.downcast_ref::<ExitError>();
        eprintln!("{}: {err}", color::error("error"));
        std::process::exit(exit.map(|e| e.code).unwrap_or(1));
    }
}
