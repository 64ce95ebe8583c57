//! Tripod CLI — serve or print cluster transparency reports.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Tripod: transparency reports for the workloads running in your cluster
#[derive(Parser, Debug)]
#[command(name = "tripod", version, about, long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./tripod.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "TRIPOD_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the HTTP(S) gateway
    Serve {
        /// Port to listen on (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,

        /// Serve plain HTTP even if TLS is configured
        #[arg(long)]
        no_tls: bool,
    },
    /// Build one report and print it as JSON
    Report {
        /// Read the cluster from a snapshot file instead of the configured source
        #[arg(short, long)]
        fixture: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Resolve a region id, or list the effective region table
    Regions {
        /// Region id to resolve
        region: Option<String>,
    },
}

fn init_tracing(verbose: u8, quiet: bool, json: bool) {
    let default = match verbose {
        0 if quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over the flag-derived level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    };

    tracing_subscriber::registry().with(layer).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet, cli.log_json);

    // Validated by the subcommand, after its flags are applied.
    let config = tripod_core::read_config(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    commands::handle_command(cli.command, config).await
}
