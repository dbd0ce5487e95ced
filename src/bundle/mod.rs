//! Bulk tile bundles.
//!
//! This module turns one `(source, zoom, x, y, format)` request into an
//! archive of the root tile and every stored descendant.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             BundleService               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  SizeCache   │  │  fetch_tiles    │  │
//! │  │  (HEAD       │  │  (ordered,      │  │
//! │  │   lengths)   │  │   bounded)      │  │
//! │  └──────────────┘  └────────┬────────┘  │
//! │                             ▼           │
//! │                  ┌─────────────────┐    │
//! │                  │  ArchiveWriter  │    │
//! │                  │  (tar → gz/br)  │    │
//! │                  └─────────────────┘    │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            SourceRegistry               │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`BundleService`]: validates requests and runs the pipeline
//! - [`fetch_tiles`]: ordered, bounded-concurrency store lookups
//! - [`ArchiveWriter`]: tar entries through an optional compressor
//! - [`SizeCache`]: body lengths for cheap HEAD answers
//! - [`BundleFormat`]: the `tar`, `tar.gz` and `tar.br` extensions

mod archive;
mod cache;
mod fetch;
mod format;
mod service;

pub use archive::{ArchiveWriter, TileRecord, BLOCK_SIZE};
pub use cache::{SizeCache, SizeCacheKey};
pub use fetch::{fetch_tiles, FetchOutcome};
pub use format::{BundleFormat, Compression};
pub use service::{
    Bundle, BundleRequest, BundleService, BundleStats, ValidatedRequest,
    DEFAULT_FETCH_CONCURRENCY, DEFAULT_MIN_ZOOM,
};
