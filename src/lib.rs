//! # Bulk Tile Server
//!
//! An HTTP server that returns a map tile together with all of its
//! descendant tiles as a single archive.
//!
//! A request for `/{source}/{z}/{x}/{y}.tar` walks the quadtree below tile
//! `z/x/y` down to the source's maximum zoom, looks each tile up in an
//! MBTiles file, and packs every tile found into a tar archive, optionally
//! compressed with gzip (`.tar.gz`) or brotli (`.tar.br`).
//!
//! ## Features
//!
//! - **Bulk downloads**: One request fetches a whole pyramid of tiles
//! - **Multiple sources**: Each MBTiles file is served under its own id
//! - **Deterministic archives**: Identical requests produce identical bytes
//! - **Cheap HEAD requests**: Archive sizes are remembered and served without
//!   touching the tile store
//!
//! ## Architecture
//!
//! - [`coord`] - Tile coordinates and descendant enumeration
//! - [`store`] - Tile storage abstraction and the MBTiles backend
//! - [`source`] - Registry of named tile sources
//! - [`bundle`] - Fetch pipeline, archive writer and size cache
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use bulk_tile_server::{create_router, BundleService, RouterConfig, SourceRegistry};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = SourceRegistry::open_mbtiles([(
//!         "default".to_string(),
//!         PathBuf::from("world.mbtiles"),
//!     )])
//!     .await?;
//!
//!     let service = BundleService::new(registry, 10);
//!     let router = create_router(service, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod bundle;
pub mod config;
pub mod coord;
pub mod error;
pub mod server;
pub mod source;
pub mod store;

// Re-export commonly used types
pub use bundle::{
    ArchiveWriter, Bundle, BundleFormat, BundleRequest, BundleService, BundleStats, Compression,
    SizeCache, SizeCacheKey, TileRecord,
};
pub use config::{Config, SourceEntry, SourcesFile};
pub use coord::{Descendants, TileCoord, MAX_ZOOM};
pub use error::{BundleError, ConfigError, StartupError, StoreError};
pub use server::{create_router, AppState, RouterConfig};
pub use source::{SourceDescriptor, SourceRegistry, DEFAULT_SOURCE_ID};
pub use store::{MbtilesStore, StoreMetadata, TileStore};
