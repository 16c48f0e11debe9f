//! Command-line interface for kadumper
//!
//! Records go to stdout, logs to stderr. See `kadumper --help` for the flags;
//! each one can also be set through its `KADUMPER_*` environment variable.

use clap::Parser;
use kadumper::{logging, Args};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    logging::init(args.log_format, &args.log_level);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting kadumper");

    kadumper::run(args, CancellationToken::new()).await?;
    Ok(())
}
