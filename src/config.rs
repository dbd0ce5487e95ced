//! Configuration management for the bulk tile server.
//!
//! This module provides:
//! - Command-line arguments via clap
//! - Environment variables with `BTS_` prefix
//! - The JSON sources file describing several tile sources
//!
//! # Example
//!
//! ```ignore
//! use bulk_tile_server::config::Config;
//! use clap::Parser;
//!
//! let config = Config::parse();
//! config.validate()?;
//!
//! for (id, path) in config.source_entries()? {
//!     println!("{} -> {}", id, path.display());
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `BTS_HOST` - Server bind address (default: 0.0.0.0)
//! - `BTS_PORT` - Server port (default: 3000)
//! - `BTS_MBTILES` - MBTiles file served as source `default`
//! - `BTS_CONFIG` - JSON sources file
//! - `BTS_MIN_ZOOM` - Minimum zoom for bulk requests (default: 10)
//! - `BTS_FETCH_CONCURRENCY` - Tile lookups in flight per request (default: 8)
//! - `BTS_SIZE_CACHE_ENTRIES` - Bound on the size cache (default: unbounded)
//! - `BTS_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `BTS_CORS_ORIGINS` - Allowed CORS origins, comma-separated
//!
//! # Sources File
//!
//! ```json
//! {
//!   "sources": {
//!     "osm": { "path": "/data/osm.mbtiles" },
//!     "satellite": { "path": "/data/satellite.mbtiles" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::bundle::{DEFAULT_FETCH_CONCURRENCY, DEFAULT_MIN_ZOOM};
use crate::coord::MAX_ZOOM;
use crate::error::ConfigError;
use crate::server::DEFAULT_CACHE_MAX_AGE;
use crate::source::DEFAULT_SOURCE_ID;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Bulk tile server - download a tile and all its descendants as one archive.
///
/// Serves `GET /{source}/{z}/{x}/{y}.tar|.tar.gz|.tar.br` from one or more
/// MBTiles files.
#[derive(Parser, Debug, Clone)]
#[command(name = "bulk-tile-server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "BTS_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "BTS_PORT")]
    pub port: u16,

    // =========================================================================
    // Source Configuration
    // =========================================================================
    /// MBTiles file to serve under the source id `default`.
    #[arg(short, long, env = "BTS_MBTILES")]
    pub mbtiles: Option<PathBuf>,

    /// JSON file listing sources: {"sources": {"<id>": {"path": "<file>"}}}.
    #[arg(short, long, env = "BTS_CONFIG")]
    pub config: Option<PathBuf>,

    // =========================================================================
    // Bundle Configuration
    // =========================================================================
    /// Lowest zoom level accepted for bulk requests.
    #[arg(short = 'z', long, default_value_t = DEFAULT_MIN_ZOOM, env = "BTS_MIN_ZOOM")]
    pub min_zoom: u8,

    /// Number of tile lookups in flight per request.
    #[arg(long, default_value_t = DEFAULT_FETCH_CONCURRENCY, env = "BTS_FETCH_CONCURRENCY")]
    pub fetch_concurrency: usize,

    /// Maximum number of response sizes remembered for HEAD requests.
    ///
    /// If not specified, the size cache is unbounded.
    #[arg(long, env = "BTS_SIZE_CACHE_ENTRIES")]
    pub size_cache_entries: Option<usize>,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "BTS_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "BTS_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mbtiles.is_none() && self.config.is_none() {
            return Err(ConfigError::Invalid(
                "No tile source configured. Set --mbtiles or --config \
                 (BTS_MBTILES / BTS_CONFIG)"
                    .to_string(),
            ));
        }

        if self.min_zoom > MAX_ZOOM {
            return Err(ConfigError::Invalid(format!(
                "min_zoom must be at most {}",
                MAX_ZOOM
            )));
        }

        if self.fetch_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "fetch_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.size_cache_entries == Some(0) {
            return Err(ConfigError::Invalid(
                "size_cache_entries must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Bound for the size cache, if one was given.
    pub fn size_cache_capacity(&self) -> Option<NonZeroUsize> {
        self.size_cache_entries.and_then(NonZeroUsize::new)
    }

    /// All `(id, path)` pairs to open: `--mbtiles` first as `default`, then
    /// the sources file in id order.
    pub fn source_entries(&self) -> Result<Vec<(String, PathBuf)>, ConfigError> {
        let mut entries = Vec::new();

        if let Some(ref path) = self.mbtiles {
            entries.push((DEFAULT_SOURCE_ID.to_string(), path.clone()));
        }

        if let Some(ref path) = self.config {
            let file = SourcesFile::load(path)?;
            entries.extend(file.sources.into_iter().map(|(id, entry)| (id, entry.path)));
        }

        Ok(entries)
    }
}

// =============================================================================
// Sources File
// =============================================================================

/// Contents of the `--config` JSON file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourcesFile {
    pub sources: BTreeMap<String, SourceEntry>,
}

/// One source in the sources file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: PathBuf,
}

impl SourcesFile {
    /// Read and parse a sources file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
