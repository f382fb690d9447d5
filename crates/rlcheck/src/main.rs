//! rlcheck
//!
//! Checks the risk level and categories of IP addresses, domains and URLs
//! against the ThreatExplorer reputation API, so that only indicators the
//! WSS/ProxySG policy does not already block need to be added to it.
//!
//! The input CSV needs at least the `ThreatType` and `Indicator` columns. The
//! three outputs (`blocked`, `policy`, `error`) land in the output directory.

use anyhow::{bail, Result};
use clap::Parser;
use rlcheck_classifiers::ThreatExplorerClient;
use rlcheck_pipeline::{IndicatorReader, Pipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod config;

use config::RunConfig;

#[derive(Parser, Debug)]
#[command(name = "rlcheck", version)]
#[command(
    about = "Check risk level for URL, IP and Domain to exclude already blocked items in the Proxy/WSS Policy",
    long_about = None
)]
struct Cli {
    /// Input CSV file with ThreatType and Indicator columns
    input: PathBuf,

    /// Output directory
    #[arg(short = 'f', long, default_value = "output")]
    output_dir: PathBuf,

    /// Concurrent worker threads [default: 10]
    #[arg(short, long)]
    threads: Option<usize>,

    /// Seconds between progress updates [default: 5]
    #[arg(short, long)]
    interval: Option<u64>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// ThreatExplorer API key
    #[arg(long, env = "TEX_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    // The API key usually lives in a .env file next to the input
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if !cli.input.is_file() {
        bail!("Invalid input file: {}", cli.input.display());
    }

    let config = RunConfig::load(&cli)?;

    let count = IndicatorReader::count(&cli.input, config.pipeline.input_delimiter)?;
    info!(
        "Checking {} IOC's in {} with {} threads...",
        count,
        cli.input.display(),
        config.pipeline.workers
    );

    let classifier = ThreatExplorerClient::new(config.threat_explorer, config.policy)?;
    let mut pipeline = Pipeline::new(config.pipeline, Arc::new(classifier));
    let summary = pipeline.run(&cli.input, &cli.output_dir)?;

    for report in &summary.outputs {
        match &report.path {
            Some(path) => info!("{}: {} written to {}", report.role, report.written, path.display()),
            None => info!("{}: nothing to write", report.role),
        }
    }
    info!("Finished in {:.1}s", summary.elapsed.as_secs_f64());

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("rlcheck=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rlcheck=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
