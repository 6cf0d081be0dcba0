use std::sync::Arc;

use tracing::{error, info};

use newshub::datetime::format_time_ago;
use newshub::{Aggregator, Config, Database, HttpTextExtractor, HttpTransport, RefreshOutcome};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = newshub::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        newshub::logging::init_console_only(&config.logging.level);
    }

    info!("NewsHub - Feed Aggregation Engine");

    let db = match Database::open(&config.storage.database_path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {e}");
            return;
        }
    };

    let transport = match HttpTransport::new(config.fetch.timeout_secs) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            error!("Failed to build HTTP transport: {e}");
            return;
        }
    };
    let extractor = match HttpTextExtractor::new(config.fetch.timeout_secs) {
        Ok(extractor) => Arc::new(extractor),
        Err(e) => {
            error!("Failed to build text extractor: {e}");
            return;
        }
    };

    let engine = match Aggregator::new(config, db, transport, extractor) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to initialize aggregator: {e}");
            return;
        }
    };

    match engine.refresh().await {
        Ok(RefreshOutcome::Refreshed { items, sources }) => {
            info!("Fetched {items} item(s) from {sources} source(s)");
        }
        Ok(RefreshOutcome::Throttled { seconds_remaining }) => {
            info!("Cache is fresh, next refresh in {seconds_remaining} second(s)");
        }
        Ok(RefreshOutcome::Failed { reason }) => {
            error!("Refresh failed: {reason}");
        }
        Err(e) => {
            error!("Refresh failed: {e}");
        }
    }

    match engine.stats().await {
        Ok(stats) => {
            info!(
                "{} item(s) cached from {} source(s), {} new",
                stats.total_items, stats.distinct_sources, stats.new_count
            );
            if let Some(at) = stats.last_refresh_at {
                info!("Last refresh: {}", format_time_ago(at, chrono::Utc::now()));
            }
            for entry in &stats.by_source {
                info!("  {}: {}", entry.name, entry.count);
            }
        }
        Err(e) => error!("Failed to compute stats: {e}"),
    }
}
