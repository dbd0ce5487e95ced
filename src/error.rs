use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a tile store backend
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store file could not be opened or is not a tile store
    #[error("cannot open tile store {path}: {message}")]
    Open { path: PathBuf, message: String },

    /// A tile lookup failed inside the backend
    #[error("tile query failed: {0}")]
    Query(String),

    /// Store metadata is missing or unreadable
    #[error("invalid store metadata: {0}")]
    Metadata(String),

    /// The blocking task running the query was cancelled or panicked
    #[error("store task failed: {0}")]
    Task(String),
}

/// Errors produced while serving a bulk tile request.
///
/// Every variant maps to a JSON error response at the HTTP boundary.
#[derive(Debug, Clone, Error)]
pub enum BundleError {
    /// No source registered under this identifier (404)
    #[error("source '{source_id}' not found")]
    SourceNotFound { source_id: String },

    /// Requested zoom is below the configured threshold (400)
    #[error("min zoom level is {min_zoom}")]
    ZoomTooLow { min_zoom: u8 },

    /// Unknown archive extension (404)
    #[error("extension '{extension}' not supported")]
    UnsupportedFormat { extension: String },

    /// Coordinate lies outside the tile grid of its zoom level (400)
    #[error("tile {zoom}/{x}/{y} is outside the tile grid")]
    InvalidCoordinate { zoom: u64, x: u64, y: u64 },

    /// Path segments are not `{zoom}/{x}/{y}.{ext}` (404)
    #[error("not found")]
    MalformedPath,

    /// Writing or compressing the archive failed (500)
    #[error("failed to build archive: {0}")]
    Archive(String),
}

impl From<std::io::Error> for BundleError {
    fn from(err: std::io::Error) -> Self {
        BundleError::Archive(err.to_string())
    }
}

/// Errors in process configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Sources file could not be read
    #[error("cannot read sources file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sources file is not valid JSON of the expected shape
    #[error("cannot parse sources file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A setting has an invalid value
    #[error("{0}")]
    Invalid(String),
}

/// Fatal errors while preparing sources before serving
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A configured source could not be opened or described
    #[error("source '{id}': {source}")]
    Source {
        id: String,
        #[source]
        source: StoreError,
    },

    /// The same identifier was configured twice
    #[error("source '{0}' is configured more than once")]
    DuplicateSource(String),
}
