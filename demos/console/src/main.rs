//! Console Gateway Example
//!
//! Reads chat messages from stdin, one per line, and prints the reply the
//! gateway produces for each. Lines that match no rule print nothing.
//!
//! # Data Directory
//!
//! On first run a sample `config.json` is written to the data directory
//! (the platform data dir, or `./data` when there is none). Edit it and run
//! again.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package apibridge-console
//! cargo run --package apibridge-console -- --message "/call 天气"
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use apibridge::prelude::*;
use apibridge::runtime::LoggingBuilder;
use apibridge::runtime::config::default_data_dir;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Level, info};

#[derive(Debug, Parser)]
#[command(version, about = "Feed console input through an apibridge gateway")]
struct Args {
    /// Configuration file; overrides the data directory lookup.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding `config.json`.
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Configuration profile, e.g. `production`.
    #[arg(short, long)]
    profile: Option<String>,

    /// Handle a single message and exit.
    #[arg(short, long)]
    message: Option<String>,

    /// Log at debug level regardless of the configured level.
    #[arg(short, long)]
    verbose: bool,

    /// Extra filter directive, e.g. `apibridge_transport=trace`.
    #[arg(long = "log", value_name = "DIRECTIVE")]
    log_directives: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let data_dir = args
        .data_dir
        .or_else(default_data_dir)
        .unwrap_or_else(|| PathBuf::from("./data"));

    let mut builder = Gateway::builder().data_dir(&data_dir);
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile.as_str());
    }
    let config = builder.load().context("failed to load configuration")?;

    let mut logging = LoggingBuilder::from_config(&config.logging);
    if args.verbose {
        logging = logging.with_level(Level::DEBUG);
    }
    for directive in &args.log_directives {
        logging = logging.directive(directive.as_str());
    }
    logging.try_init().context("failed to initialise logging")?;

    let gateway = Gateway::from_config(&config).context("failed to start gateway")?;

    let stats = gateway.stats();
    info!(apis = stats.apis, rules = stats.rules, "Gateway ready");

    if let Some(message) = &args.message {
        if let Some(reply) = gateway.handle_message(message).await {
            println!("{reply}");
        }
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(reply) = gateway.handle_message(line).await {
            println!("{reply}");
        }
    }

    let stats = gateway.stats();
    info!(
        received = stats.received,
        matched = stats.matched,
        failed = stats.failed,
        "Input closed"
    );
    Ok(())
}
