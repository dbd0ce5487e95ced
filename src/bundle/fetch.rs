//! Tile fetch stage.
//!
//! Turns the descendant sequence into a stream of store lookups. Up to
//! `concurrency` lookups are in flight at once, but results come out in
//! enumeration order, so archive entry order never depends on store latency.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::coord::{Descendants, TileCoord};
use crate::error::StoreError;
use crate::store::TileStore;

/// Result of looking up one coordinate.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The store returned tile bytes
    Found(Bytes),
    /// No tile is stored at this coordinate
    Missing,
    /// The store failed to answer
    Failed(StoreError),
}

impl From<Result<Option<Bytes>, StoreError>> for FetchOutcome {
    fn from(result: Result<Option<Bytes>, StoreError>) -> Self {
        match result {
            Ok(Some(data)) => FetchOutcome::Found(data),
            Ok(None) => FetchOutcome::Missing,
            Err(err) => FetchOutcome::Failed(err),
        }
    }
}

/// Look up every coordinate of `coords` in `store`, in order.
///
/// `concurrency` is clamped to at least 1.
pub fn fetch_tiles<'a>(
    store: &'a dyn TileStore,
    coords: Descendants,
    concurrency: usize,
) -> impl Stream<Item = (TileCoord, FetchOutcome)> + Send + 'a {
    stream::iter(coords)
        .map(move |coord| async move { (coord, FetchOutcome::from(store.get_tile(coord).await)) })
        .buffered(concurrency.max(1))
}
