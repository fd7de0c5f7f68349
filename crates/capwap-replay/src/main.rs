//! capwap-replay: replay a recorded observation log through the TWAP oracle.
//!
//! ```text
//! capwap-replay <observations.json> [config.toml]
//! ```
//!
//! Each replayed observation is printed to stdout as one JSON line, followed
//! by the final oracle snapshot. Logs go to stderr.

mod config;
mod replay;

use std::path::PathBuf;

use anyhow::Context;
use capwap_types::events::Event;
use tracing::{debug, info, warn};

use crate::config::ReplayConfig;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let Some(observations_path) = args.get(1).map(PathBuf::from) else {
        anyhow::bail!("usage: capwap-replay <observations.json> [config.toml]");
    };
    let config_path = args.get(2).map(PathBuf::from);

    let config = ReplayConfig::load(config_path.as_deref())?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.log_level)),
        )
        .init();

    let content = std::fs::read_to_string(&observations_path)
        .with_context(|| format!("reading {}", observations_path.display()))?;
    let observations = replay::parse_observations(&content)?;
    info!(count = observations.len(), "replaying observations");

    let mut oracle = config.oracle.build()?;
    for record in replay::replay(&mut oracle, &observations) {
        if let Some(update) = &record.update {
            match Event::price_updated(update) {
                Ok(event) => debug!(?event, "notification"),
                Err(e) => warn!(timestamp = update.timestamp, error = %e, "failed to build notification envelope"),
            }
        }
        println!("{}", serde_json::to_string(&record)?);
    }

    println!("{}", serde_json::to_string_pretty(&oracle.snapshot())?);
    info!(last_timestamp = oracle.last_timestamp(), "replay complete");
    Ok(())
}
