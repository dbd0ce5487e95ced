use async_trait::async_trait;
use bytes::Bytes;

use crate::coord::TileCoord;
use crate::error::StoreError;

/// Metadata a store exposes about its tile pyramid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMetadata {
    /// Shallowest zoom level present
    pub min_zoom: u8,

    /// Deepest zoom level present; bulk requests descend to this level
    pub max_zoom: u8,

    /// Human-readable tileset name, if the store records one
    pub name: Option<String>,

    /// Tile payload format (e.g. "png", "pbf"), if recorded
    pub format: Option<String>,
}

impl StoreMetadata {
    pub fn new(min_zoom: u8, max_zoom: u8) -> Self {
        Self {
            min_zoom,
            max_zoom,
            name: None,
            format: None,
        }
    }
}

/// Key-value access to stored tiles keyed by zoom/x/y.
///
/// Implementations must be thread-safe; one store is shared by every request
/// against its source.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Read the store's metadata.
    ///
    /// Called once per source before the server starts accepting requests.
    async fn metadata(&self) -> Result<StoreMetadata, StoreError>;

    /// Read the tile at `coord`.
    ///
    /// Returns `Ok(None)` when no tile is stored there and `Err` only for
    /// backend faults.
    async fn get_tile(&self, coord: TileCoord) -> Result<Option<Bytes>, StoreError>;

    /// Identifier for logging (typically the file path).
    fn identifier(&self) -> &str;
}
