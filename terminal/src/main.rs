mod console;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tagview_core::{MatchData, ReplaySession};
use tracing::info;

use crate::console::ConsoleSink;

#[derive(Parser, Debug)]
#[command(name = "tagview", about = "Replay or follow a laser-tag match in the terminal")]
struct Args {
    /// Path to a recorded match JSON file
    #[arg(long, conflicts_with = "live_url")]
    match_file: Option<String>,

    /// WebSocket endpoint of a live match feed (e.g. ws://localhost:8080/live)
    #[arg(long)]
    live_url: Option<String>,

    /// Playback rate multiplier
    #[arg(long, default_value_t = 1.0)]
    rate: f64,

    /// Start playback at this many seconds into the match
    #[arg(long, default_value_t = 0.0)]
    start: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let args = Args::parse();
    let session = ReplaySession::new(Arc::new(ConsoleSink));

    if let Some(endpoint) = &args.live_url {
        session.watch_live(true);
        session
            .connect_live(endpoint)
            .with_context(|| format!("invalid live endpoint {endpoint}"))?;
        info!("following live feed; press ctrl-c to quit");
        tokio::signal::ctrl_c().await?;
        return Ok(());
    }

    let path = args
        .match_file
        .context("either --match-file or --live-url is required")?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let data = MatchData::from_json(&raw).with_context(|| format!("parsing {path}"))?;
    session.load_match(data)?;

    session.set_rate(args.rate);
    session.seek(args.start);
    session.play();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if !session.is_playing() {
                    break;
                }
            }
        }
    }
    println!();
    Ok(())
}
