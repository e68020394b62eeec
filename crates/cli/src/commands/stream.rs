// SPDX-License-Identifier: MIT

//! `fleet stream` — `GET /run/{id}/stream` (spec 6): replays history then
//! follows the live tail until the connection ends or the user interrupts.

use clap::Args;
use fleet_wire::StreamFrame;

use crate::client::FleetClient;
use crate::color;

#[derive(Debug, Args)]
pub struct StreamArgs {
    run_id: String,

    /// Print the raw JSON frame instead of a formatted line.
    #[arg(long)]
    raw: bool,

    /// Include `ping` keep-alive frames in the output.
    #[arg(long)]
    show_pings: bool,
}

pub async fn handle(client: &FleetClient, args: StreamArgs) -> anyhow::Result<()> {
    client
        .stream_run(&args.run_id, |raw_frame| {
            let Ok(frame) = serde_json::from_str::<StreamFrame>(raw_frame) else {
                return;
            };
            if frame.is_ping() && !args.show_pings {
                return;
            }
            if args.raw {
                println!("{raw_frame}");
            } else {
                println!(
                    "[{}] {} {}",
                    color::muted(frame.provider.as_str()),
                    color::header(&frame.frame_type),
                    frame.data
                );
            }
        })
        .await?;
    Ok(())
}
