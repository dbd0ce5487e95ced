//! Registry mapping source identifiers to opened tile stores.
//!
//! # Example
//!
//! ```ignore
//! use bulk_tile_server::source::SourceRegistry;
//!
//! let registry = SourceRegistry::open_mbtiles([
//!     ("default".to_string(), "/data/world.mbtiles".into()),
//! ])
//! .await?;
//!
//! let source = registry.resolve("default").unwrap();
//! println!("max zoom: {}", source.max_zoom());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::error::StartupError;
use crate::store::{MbtilesStore, StoreMetadata, TileStore};

/// Identifier used for a source given directly with `--mbtiles`.
pub const DEFAULT_SOURCE_ID: &str = "default";

// =============================================================================
// SourceDescriptor
// =============================================================================

/// An opened tile source and the metadata read from it at startup.
pub struct SourceDescriptor {
    id: String,
    store: Arc<dyn TileStore>,
    metadata: StoreMetadata,
}

impl SourceDescriptor {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store(&self) -> &Arc<dyn TileStore> {
        &self.store
    }

    pub fn metadata(&self) -> &StoreMetadata {
        &self.metadata
    }

    /// Deepest zoom present in the data; bulk requests stop here.
    pub fn max_zoom(&self) -> u8 {
        self.metadata.max_zoom
    }

    pub fn min_zoom(&self) -> u8 {
        self.metadata.min_zoom
    }
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("id", &self.id)
            .field("store", &self.store.identifier())
            .field("metadata", &self.metadata)
            .finish()
    }
}

// =============================================================================
// SourceRegistry
// =============================================================================

/// Immutable set of sources, keyed by identifier.
///
/// Built before the listener is bound and shared read-only by all requests.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<SourceDescriptor>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open each `(id, path)` as an MBTiles store and register it.
    ///
    /// # Errors
    ///
    /// Fails on the first store that cannot be opened or described, or on a
    /// repeated identifier.
    pub async fn open_mbtiles(
        entries: impl IntoIterator<Item = (String, PathBuf)>,
    ) -> Result<Self, StartupError> {
        let mut registry = Self::new();
        for (id, path) in entries {
            let store = MbtilesStore::open(&path).map_err(|source| StartupError::Source {
                id: id.clone(),
                source,
            })?;
            registry.register(id, Arc::new(store)).await?;
        }
        Ok(registry)
    }

    /// Read the store's metadata and add it under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Source`] if metadata cannot be read and
    /// [`StartupError::DuplicateSource`] if `id` is already registered.
    pub async fn register(
        &mut self,
        id: impl Into<String>,
        store: Arc<dyn TileStore>,
    ) -> Result<(), StartupError> {
        let id = id.into();
        if self.sources.contains_key(&id) {
            return Err(StartupError::DuplicateSource(id));
        }

        let metadata = store
            .metadata()
            .await
            .map_err(|source| StartupError::Source {
                id: id.clone(),
                source,
            })?;

        info!(
            source = %id,
            store = store.identifier(),
            min_zoom = metadata.min_zoom,
            max_zoom = metadata.max_zoom,
            "Registered tile source"
        );

        let descriptor = SourceDescriptor {
            id: id.clone(),
            store,
            metadata,
        };
        self.sources.insert(id, Arc::new(descriptor));
        Ok(())
    }

    /// Look up a source by identifier.
    pub fn resolve(&self, id: &str) -> Option<Arc<SourceDescriptor>> {
        self.sources.get(id).cloned()
    }

    /// All sources, sorted by identifier.
    pub fn sources(&self) -> Vec<Arc<SourceDescriptor>> {
        let mut sources: Vec<_> = self.sources.values().cloned().collect();
        sources.sort_by(|a, b| a.id.cmp(&b.id));
        sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
