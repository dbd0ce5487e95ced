//! Response-size cache for HEAD probes.
//!
//! Remembers the body length of every completed bundle so a later HEAD for
//! the same request can answer `Content-Length` without fetching or packing
//! anything.
//!
//! # Cache Key
//!
//! Sizes are keyed by:
//! - Source identifier
//! - Root tile zoom, x and y
//! - Bundle format (`tar`, `tar.gz` and `tar.br` have different lengths)
//!
//! # Lifetime
//!
//! By default the cache is unbounded: entries are never evicted and never
//! invalidated, so a long-running process grows it by one small entry per
//! distinct request. A capacity turns it into an LRU cache.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::RwLock;

use super::format::BundleFormat;

// =============================================================================
// Cache Key
// =============================================================================

/// Identity of a bulk response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SizeCacheKey {
    pub source_id: Arc<str>,
    pub zoom: u64,
    pub x: u64,
    pub y: u64,
    pub format: BundleFormat,
}

impl SizeCacheKey {
    pub fn new(
        source_id: impl Into<Arc<str>>,
        zoom: u64,
        x: u64,
        y: u64,
        format: BundleFormat,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            zoom,
            x,
            y,
            format,
        }
    }
}

// =============================================================================
// Size Cache
// =============================================================================

/// Shared map from response identity to body length in bytes.
///
/// Thread-safe; share via `Arc` or embed in a service. Concurrent `put`s for
/// the same key resolve as last writer wins.
pub struct SizeCache {
    entries: RwLock<LruCache<SizeCacheKey, u64>>,
    capacity: Option<NonZeroUsize>,
}

impl SizeCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(LruCache::unbounded()),
            capacity: None,
        }
    }

    /// Create a cache holding at most `capacity` entries, evicting the least
    /// recently used.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            capacity: Some(capacity),
        }
    }

    /// Get the recorded length for `key`.
    pub async fn get(&self, key: &SizeCacheKey) -> Option<u64> {
        let mut entries = self.entries.write().await;
        entries.get(key).copied()
    }

    /// Record the length for `key`, replacing any previous value.
    pub async fn put(&self, key: SizeCacheKey, len: u64) {
        let mut entries = self.entries.write().await;
        entries.put(key, len);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Maximum number of entries, or `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity.map(NonZeroUsize::get)
    }
}

impl Default for SizeCache {
    fn default() -> Self {
        Self::new()
    }
}
