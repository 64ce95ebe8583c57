//! Subcommand handlers for the Tripod CLI.

use crate::Commands;
use std::path::PathBuf;
use tracing::info;
use tripod_core::config::{SourceKind, TripodConfig};
use tripod_core::gateway::{GatewayServer, run_gateway};
use tripod_core::source::{self, MetadataSource};
use tripod_core::{RegionTable, build_report};

/// Dispatch a parsed subcommand.
///
/// `config` is validated only after the subcommand's flags are applied.
pub async fn handle_command(command: Commands, config: TripodConfig) -> anyhow::Result<()> {
    match command {
        Commands::Serve { port, no_tls } => {
            serve(validated(apply_serve_flags(config, port, no_tls))?).await
        }
        Commands::Report { fixture, pretty } => {
            report(&validated(apply_report_flags(config, fixture))?, pretty).await
        }
        Commands::Regions { region } => {
            let config = validated(config)?;
            print!("{}", regions(&config.regions.table(), region.as_deref()));
            Ok(())
        }
    }
}

fn validated(config: TripodConfig) -> anyhow::Result<TripodConfig> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    Ok(config)
}

fn apply_report_flags(mut config: TripodConfig, fixture: Option<PathBuf>) -> TripodConfig {
    if let Some(path) = fixture {
        config.source.kind = SourceKind::File;
        config.source.fixture = Some(path);
    }
    config
}

fn apply_serve_flags(mut config: TripodConfig, port: Option<u16>, no_tls: bool) -> TripodConfig {
    if let Some(port) = port {
        config.server.port = port;
    }
    if no_tls {
        config.server.tls.enabled = false;
    }
    config
}

async fn serve(config: TripodConfig) -> anyhow::Result<()> {
    let source = source::from_config(&config.source)?;
    info!(source = %source.describe(), "Starting Tripod gateway");

    let gateway = GatewayServer::new(source, config.regions.table()).shared();
    run_gateway(&config.server, gateway).await?;
    Ok(())
}

async fn report(config: &TripodConfig, pretty: bool) -> anyhow::Result<()> {
    let source = source::from_config(&config.source)?;

    let snapshot = source.snapshot().await?;
    let report = build_report(&snapshot, &config.regions.table())?;

    let json = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}

/// Render one resolution, or the whole table as `region<TAB>country` lines.
fn regions(table: &RegionTable, region: Option<&str>) -> String {
    match region {
        Some(region) => {
            let country = table.resolve(region);
            if country.is_empty() {
                format!("{region}: unknown\n")
            } else {
                format!("{region}: {country}\n")
            }
        }
        None => table
            .iter()
            .map(|(region, country)| format!("{region}\t{country}\n"))
            .collect(),
    }
}
