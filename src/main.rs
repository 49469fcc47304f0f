//! Strata insights - NSW strata plan search and street-level aggregation
//!
//! Module structure:
//! - `domain/` - Core types (BuildingRecord, StreetAggregate, views)
//! - `io/` - External interfaces (StrataHub client, HTTP API, CSV export)
//! - `services/` - Business logic (street names, suburb resolution, aggregation)
//! - `infra/` - Infrastructure (Config, gazetteer, errors)

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use strata_insights::infra::{Config, SuburbReferenceSet};
use strata_insights::io::{start_api_server, StrataHubClient};
use strata_insights::services::StrataService;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Strata insights - aggregate NSW strata plans by street
#[derive(Parser, Debug)]
#[command(name = "strata-insights", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Default: INFO, use RUST_LOG=debug for per-request and per-page events
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("strata-insights starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        bind_address = %config.bind_address(),
        port = %config.port(),
        upstream_url = %config.upstream_url(),
        gazetteer_path = %config.gazetteer_path(),
        fuzzy_threshold = %config.fuzzy_threshold(),
        postcode_fallbacks = ?config.postcode_fallbacks(),
        min_lots = %config.min_lots(),
        "config_loaded"
    );

    // A missing gazetteer is not fatal: requests retry the load and fail with 503
    let reference =
        Arc::new(SuburbReferenceSet::new(config.gazetteer_path(), config.gazetteer_name_column()));
    if let Err(e) = reference.load() {
        warn!(path = %config.gazetteer_path(), error = %e, "gazetteer_unavailable_at_startup");
    }

    let client = StrataHubClient::new(&config)?;
    let service = Arc::new(StrataService::new(&config, reference, client));

    let addr: SocketAddr = format!("{}:{}", config.bind_address(), config.port()).parse()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    if let Err(e) = start_api_server(addr, service, shutdown_rx).await {
        error!(error = %e, "api_server_error");
        return Err(e);
    }

    info!("strata-insights shutdown complete");
    Ok(())
}
