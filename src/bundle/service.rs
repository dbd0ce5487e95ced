//! Bundle service: orchestrates one bulk request.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        BundleService                             │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │  validate()            build()                          │    │
//! │  │  1. source exists      4. enumerate descendants         │    │
//! │  │  2. zoom ≥ min zoom    5. fetch (bounded, ordered)      │    │
//! │  │  3. format known       6. pack + compress               │    │
//! │  │  (+ coordinate in grid) 7. record size                  │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │            │
//! │           ▼                    ▼                    ▼            │
//! │   ┌──────────────┐     ┌─────────────┐    ┌──────────────────┐  │
//! │   │SourceRegistry│     │  SizeCache  │    │  ArchiveWriter   │  │
//! │   └──────────────┘     └─────────────┘    └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tracing::{debug, warn};

use super::archive::{ArchiveWriter, TileRecord};
use super::cache::{SizeCache, SizeCacheKey};
use super::fetch::{fetch_tiles, FetchOutcome};
use super::format::BundleFormat;
use crate::coord::{in_grid, Descendants, TileCoord, MAX_ZOOM};
use crate::error::BundleError;
use crate::source::{SourceDescriptor, SourceRegistry};

/// Default process-wide minimum zoom for bulk requests.
pub const DEFAULT_MIN_ZOOM: u8 = 10;

/// Default number of tile lookups in flight per request.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

// =============================================================================
// Bundle Request
// =============================================================================

/// Raw parameters of a bulk request, as parsed from the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRequest {
    pub source_id: String,
    pub zoom: u64,
    pub x: u64,
    pub y: u64,
    /// Extension after the first dot of the last path segment
    pub extension: String,
}

impl BundleRequest {
    pub fn new(
        source_id: impl Into<String>,
        zoom: u64,
        x: u64,
        y: u64,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            zoom,
            x,
            y,
            extension: extension.into(),
        }
    }
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub source: Arc<SourceDescriptor>,
    pub zoom: u64,
    pub x: u64,
    pub y: u64,
    /// First coordinate to enumerate, or `None` when the requested tile is
    /// deeper than the source's data and the archive is empty.
    pub root: Option<TileCoord>,
    pub format: BundleFormat,
}

impl ValidatedRequest {
    pub fn cache_key(&self) -> SizeCacheKey {
        SizeCacheKey::new(self.source.id(), self.zoom, self.x, self.y, self.format)
    }

    /// The requested tile as `zoom/x/y`.
    pub fn tile(&self) -> String {
        format!("{}/{}/{}", self.zoom, self.x, self.y)
    }
}

// =============================================================================
// Bundle
// =============================================================================

/// Per-request counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BundleStats {
    /// Entries written to the archive
    pub tiles_written: usize,
    /// Coordinates with no stored tile
    pub tiles_missing: usize,
    /// Coordinates whose lookup failed in the store
    pub tiles_failed: usize,
}

impl BundleStats {
    /// Coordinates visited.
    pub fn tiles_requested(&self) -> usize {
        self.tiles_written + self.tiles_missing + self.tiles_failed
    }
}

/// A finished archive body.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub data: Bytes,
    pub format: BundleFormat,
    pub stats: BundleStats,
}

// =============================================================================
// Bundle Service
// =============================================================================

/// Service driving bulk requests against a set of sources.
///
/// # Example
///
/// ```ignore
/// use bulk_tile_server::bundle::{BundleRequest, BundleService};
///
/// let service = BundleService::new(registry, 10);
/// let request = service.validate(&BundleRequest::new("default", 10, 5, 5, "tar.gz"))?;
/// let bundle = service.build(&request).await?;
/// println!("{} tiles, {} bytes", bundle.stats.tiles_written, bundle.data.len());
/// ```
pub struct BundleService {
    registry: Arc<SourceRegistry>,
    size_cache: SizeCache,
    min_zoom: u8,
    fetch_concurrency: usize,
}

impl BundleService {
    /// Create a service with an unbounded size cache and default fetch
    /// concurrency.
    pub fn new(registry: SourceRegistry, min_zoom: u8) -> Self {
        Self::with_shared_registry(Arc::new(registry), min_zoom)
    }

    /// Create a service over a registry shared with other components.
    pub fn with_shared_registry(registry: Arc<SourceRegistry>, min_zoom: u8) -> Self {
        Self {
            registry,
            size_cache: SizeCache::new(),
            min_zoom,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    /// Replace the size cache (e.g. with a bounded one).
    pub fn with_size_cache(mut self, size_cache: SizeCache) -> Self {
        self.size_cache = size_cache;
        self
    }

    /// Set how many tile lookups may be in flight per request.
    pub fn with_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = concurrency.max(1);
        self
    }

    /// Check a request in order: source, minimum zoom, format, coordinate.
    ///
    /// # Errors
    ///
    /// The first failing check decides the error.
    pub fn validate(&self, request: &BundleRequest) -> Result<ValidatedRequest, BundleError> {
        let source =
            self.registry
                .resolve(&request.source_id)
                .ok_or_else(|| BundleError::SourceNotFound {
                    source_id: request.source_id.clone(),
                })?;

        if request.zoom < u64::from(self.min_zoom) {
            return Err(BundleError::ZoomTooLow {
                min_zoom: self.min_zoom,
            });
        }

        let format = BundleFormat::from_extension(&request.extension)?;

        let invalid = || BundleError::InvalidCoordinate {
            zoom: request.zoom,
            x: request.x,
            y: request.y,
        };
        if !in_grid(request.zoom, request.x, request.y) {
            return Err(invalid());
        }

        // Nothing is stored below the source's deepest level
        let deepest = u64::from(source.max_zoom().min(MAX_ZOOM));
        let root = if request.zoom > deepest {
            None
        } else {
            let zoom = u32::try_from(request.zoom).map_err(|_| invalid())?;
            let x = u32::try_from(request.x).map_err(|_| invalid())?;
            let y = u32::try_from(request.y).map_err(|_| invalid())?;
            Some(TileCoord::new(zoom, x, y)?)
        };

        Ok(ValidatedRequest {
            source,
            zoom: request.zoom,
            x: request.x,
            y: request.y,
            root,
            format,
        })
    }

    /// Body length recorded for an identical earlier request, if any.
    pub async fn cached_size(&self, request: &ValidatedRequest) -> Option<u64> {
        self.size_cache.get(&request.cache_key()).await
    }

    /// Fetch, pack and compress every stored tile under the root, then record
    /// the body length in the size cache.
    ///
    /// Missing tiles and store failures are left out of the archive; they
    /// never fail the request.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Archive`] if the encoder fails.
    pub async fn build(&self, request: &ValidatedRequest) -> Result<Bundle, BundleError> {
        let source = &request.source;
        let mut writer = ArchiveWriter::new(request.format.compression());
        let mut stats = BundleStats::default();

        if let Some(root) = request.root {
            let descendants = Descendants::new(root, source.max_zoom());

            debug!(
                source = source.id(),
                root = %root,
                format = %request.format,
                max_zoom = source.max_zoom(),
                coordinates = descendants.size_hint().0,
                "Building bundle"
            );

            let mut tiles = fetch_tiles(
                source.store().as_ref(),
                descendants,
                self.fetch_concurrency,
            );
            while let Some((coord, outcome)) = tiles.next().await {
                match outcome {
                    FetchOutcome::Found(data) => {
                        writer.append(&TileRecord::new(coord, data)).await?;
                        stats.tiles_written += 1;
                    }
                    FetchOutcome::Missing => stats.tiles_missing += 1,
                    FetchOutcome::Failed(err) => {
                        warn!(
                            source = source.id(),
                            tile = %coord,
                            error = %err,
                            "Tile lookup failed, leaving it out of the archive"
                        );
                        stats.tiles_failed += 1;
                    }
                }
            }
        } else {
            debug!(
                source = source.id(),
                tile = %request.tile(),
                max_zoom = source.max_zoom(),
                "Root below deepest level, building empty bundle"
            );
        }

        let data = writer.finish().await?;
        self.size_cache
            .put(request.cache_key(), data.len() as u64)
            .await;

        debug!(
            source = source.id(),
            tile = %request.tile(),
            format = %request.format,
            bytes = data.len(),
            written = stats.tiles_written,
            missing = stats.tiles_missing,
            failed = stats.tiles_failed,
            "Bundle complete"
        );

        Ok(Bundle {
            data,
            format: request.format,
            stats,
        })
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn size_cache(&self) -> &SizeCache {
        &self.size_cache
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    pub fn fetch_concurrency(&self) -> usize {
        self.fetch_concurrency
    }
}
