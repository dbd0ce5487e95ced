//! Test utilities for integration tests.
//!
//! This module provides a mock tile store with request tracking, helpers for
//! driving the router, and decoders for the archive bodies it returns.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_compression::tokio::bufread::{BrotliDecoder, GzipDecoder};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use rusqlite::{params, Connection};
use tokio::io::AsyncReadExt;
use tower::ServiceExt;

use bulk_tile_server::bundle::BundleService;
use bulk_tile_server::coord::TileCoord;
use bulk_tile_server::error::StoreError;
use bulk_tile_server::server::{create_router, RouterConfig};
use bulk_tile_server::source::SourceRegistry;
use bulk_tile_server::store::{StoreMetadata, TileStore};

// =============================================================================
// Mock Tile Store with Request Tracking
// =============================================================================

/// An in-memory tile store that counts lookups and can inject faults.
pub struct MockTileStore {
    max_zoom: u8,
    name: Option<String>,
    tiles: HashMap<TileCoord, Bytes>,
    failing: HashSet<TileCoord>,
    delay: Option<Duration>,
    request_count: Arc<AtomicUsize>,
}

impl MockTileStore {
    pub fn new(max_zoom: u8) -> Self {
        Self {
            max_zoom,
            name: None,
            tiles: HashMap::new(),
            failing: HashSet::new(),
            delay: None,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tile(mut self, zoom: u32, x: u32, y: u32, data: impl Into<Bytes>) -> Self {
        self.tiles.insert(coord(zoom, x, y), data.into());
        self
    }

    /// Make lookups of this coordinate fail with a store error.
    pub fn with_failure(mut self, zoom: u32, x: u32, y: u32) -> Self {
        self.failing.insert(coord(zoom, x, y));
        self
    }

    /// Delay every lookup, to keep requests in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared handle to the lookup counter, usable after the store is moved
    /// into a registry.
    pub fn request_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.request_count)
    }
}

#[async_trait]
impl TileStore for MockTileStore {
    async fn metadata(&self) -> Result<StoreMetadata, StoreError> {
        let mut metadata = StoreMetadata::new(0, self.max_zoom);
        metadata.name = self.name.clone();
        Ok(metadata)
    }

    async fn get_tile(&self, coord: TileCoord) -> Result<Option<Bytes>, StoreError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&coord) {
            return Err(StoreError::Query(format!("injected failure at {}", coord)));
        }
        Ok(self.tiles.get(&coord).cloned())
    }

    fn identifier(&self) -> &str {
        "mock://tiles"
    }
}

pub fn coord(zoom: u32, x: u32, y: u32) -> TileCoord {
    TileCoord::new(zoom, x, y).unwrap()
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

// =============================================================================
// Router Helpers
// =============================================================================

/// Build a router serving `store` as source `default`.
pub async fn router_with_store(store: MockTileStore, min_zoom: u8) -> Router {
    router_with_sources(vec![("default", store)], min_zoom).await
}

/// Build a router serving several mock sources.
pub async fn router_with_sources(sources: Vec<(&str, MockTileStore)>, min_zoom: u8) -> Router {
    let mut registry = SourceRegistry::new();
    for (id, store) in sources {
        registry.register(id, Arc::new(store)).await.unwrap();
    }
    let service = BundleService::new(registry, min_zoom);
    create_router(service, RouterConfig::new().with_tracing(false))
}

/// A fully buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length").and_then(|v| v.parse().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub async fn send(router: &Router, method: Method, uri: &str) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    send(router, Method::GET, uri).await
}

pub async fn head(router: &Router, uri: &str) -> TestResponse {
    send(router, Method::HEAD, uri).await
}

// =============================================================================
// Archive Decoding
// =============================================================================

/// Read every `(name, payload)` entry of a plain tar body.
pub fn tar_entries(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = tar::Archive::new(archive);
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (name, data)
        })
        .collect()
}

pub async fn gunzip(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    GzipDecoder::new(data).read_to_end(&mut out).await.unwrap();
    out
}

pub async fn unbrotli(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    BrotliDecoder::new(data).read_to_end(&mut out).await.unwrap();
    out
}

// =============================================================================
// MBTiles Fixtures
// =============================================================================

/// Create an MBTiles file. `tiles` holds XYZ coordinates; rows are flipped to
/// TMS on insert.
pub fn create_mbtiles(
    dir: &Path,
    file_name: &str,
    metadata: &[(&str, &str)],
    tiles: &[(u32, u32, u32, &[u8])],
) -> PathBuf {
    let path = dir.join(file_name);
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE metadata (name TEXT, value TEXT);
         CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB);
         CREATE UNIQUE INDEX tile_index ON tiles (zoom_level, tile_column, tile_row);",
    )
    .unwrap();

    for (name, value) in metadata {
        conn.execute(
            "INSERT INTO metadata (name, value) VALUES (?1, ?2)",
            params![name, value],
        )
        .unwrap();
    }

    for (z, x, y, data) in tiles {
        let tms_row = (1u32 << z) - 1 - y;
        conn.execute(
            "INSERT INTO tiles VALUES (?1, ?2, ?3, ?4)",
            params![z, x, tms_row, data],
        )
        .unwrap();
    }

    path
}
