//! Bulk tile server - serves a tile and all its descendants as one archive.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bulk_tile_server::{
    bundle::{BundleService, SizeCache},
    config::Config,
    server::{create_router, RouterConfig},
    source::SourceRegistry,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let entries = match config.source_entries() {
        Ok(entries) => entries,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Bulk tile server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Minimum zoom: {}", config.min_zoom);
    info!("  Fetch concurrency: {}", config.fetch_concurrency);
    match config.size_cache_capacity() {
        Some(capacity) => info!("  Size cache: {} entries", capacity),
        None => info!("  Size cache: unbounded"),
    }

    // Open every source before accepting connections
    let registry = match SourceRegistry::open_mbtiles(entries).await {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to open tile sources: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for source in registry.sources() {
        info!(
            "  Source '{}': zoom {}..={}",
            source.id(),
            source.min_zoom(),
            source.max_zoom()
        );
    }

    let size_cache = match config.size_cache_capacity() {
        Some(capacity) => SizeCache::with_capacity(capacity),
        None => SizeCache::new(),
    };

    let bundle_service = BundleService::new(registry, config.min_zoom)
        .with_size_cache(size_cache)
        .with_fetch_concurrency(config.fetch_concurrency);

    let router = create_router(bundle_service, build_router_config(&config));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  Try: curl -I http://{}/default/10/0/0.tar", addr);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "bulk_tile_server=debug,tower_http=debug"
    } else {
        "bulk_tile_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the command-line configuration.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
