//! MBTiles-backed tile store.
//!
//! An MBTiles file is an SQLite database with a `tiles` table (or view)
//! keyed by `(zoom_level, tile_column, tile_row)` and a `metadata` key/value
//! table. Rows follow the TMS convention, so the XYZ `y` of a request is
//! flipped before lookup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use super::{StoreMetadata, TileStore};
use crate::coord::{TileCoord, MAX_ZOOM};
use crate::error::StoreError;

/// Default number of read-only connections per file.
pub const DEFAULT_CONNECTIONS: usize = 4;

const TILE_QUERY: &str =
    "SELECT tile_data FROM tiles WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3";

/// Read-only MBTiles store.
///
/// Holds a small pool of SQLite connections so concurrent tile reads do not
/// serialize on a single handle. Queries run on the blocking thread pool.
pub struct MbtilesStore {
    connections: Arc<Vec<Mutex<Connection>>>,
    next: AtomicUsize,
    path: PathBuf,
    identifier: String,
}

impl MbtilesStore {
    /// Open an MBTiles file with the default connection count.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] if the file cannot be opened, is not an
    /// SQLite database, or has no `tiles` table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_connections(path, DEFAULT_CONNECTIONS)
    }

    /// Open an MBTiles file with `connections` read-only handles (at least one).
    pub fn open_with_connections(
        path: impl AsRef<Path>,
        connections: usize,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let open_error = |message: String| StoreError::Open {
            path: path.clone(),
            message,
        };

        let count = connections.max(1);
        let mut pool = Vec::with_capacity(count);
        for _ in 0..count {
            let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            let conn = Connection::open_with_flags(&path, flags)
                .map_err(|e| open_error(e.to_string()))?;
            pool.push(conn);
        }

        let has_tiles: bool = pool[0]
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE name = 'tiles' AND type IN ('table', 'view'))",
                [],
                |row| row.get(0),
            )
            .map_err(|e| open_error(e.to_string()))?;
        if !has_tiles {
            return Err(open_error("missing 'tiles' table".to_string()));
        }

        debug!(path = %path.display(), connections = count, "Opened MBTiles store");

        Ok(Self {
            connections: Arc::new(pool.into_iter().map(Mutex::new).collect()),
            next: AtomicUsize::new(0),
            identifier: path.display().to_string(),
            path,
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` on one of the pooled connections, off the async runtime.
    async fn with_connection<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        let connections = Arc::clone(&self.connections);

        tokio::task::spawn_blocking(move || {
            let conn = connections[index]
                .lock()
                .map_err(|_| StoreError::Query("connection lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl TileStore for MbtilesStore {
    async fn metadata(&self) -> Result<StoreMetadata, StoreError> {
        self.with_connection(read_metadata).await
    }

    async fn get_tile(&self, coord: TileCoord) -> Result<Option<Bytes>, StoreError> {
        self.with_connection(move |conn| {
            let mut stmt = conn
                .prepare_cached(TILE_QUERY)
                .map_err(|e| StoreError::Query(e.to_string()))?;
            stmt.query_row(params![coord.zoom, coord.x, coord.tms_y()], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()
            .map(|data| data.map(Bytes::from))
            .map_err(|e| StoreError::Query(e.to_string()))
        })
        .await
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Read the metadata table, deriving missing zoom bounds from `tiles`.
fn read_metadata(conn: &Connection) -> Result<StoreMetadata, StoreError> {
    let mut stmt = conn
        .prepare("SELECT name, value FROM metadata")
        .map_err(|e| StoreError::Metadata(e.to_string()))?;
    let entries: HashMap<String, String> = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .and_then(|rows| rows.collect())
        .map_err(|e| StoreError::Metadata(e.to_string()))?;

    let mut min_zoom = entries
        .get("minzoom")
        .map(|v| parse_zoom("minzoom", v))
        .transpose()?;
    let mut max_zoom = entries
        .get("maxzoom")
        .map(|v| parse_zoom("maxzoom", v))
        .transpose()?;

    if min_zoom.is_none() || max_zoom.is_none() {
        let (lo, hi): (Option<i64>, Option<i64>) = conn
            .query_row(
                "SELECT MIN(zoom_level), MAX(zoom_level) FROM tiles",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| StoreError::Metadata(e.to_string()))?;
        if min_zoom.is_none() {
            min_zoom = lo.map(|z| parse_zoom("minzoom", &z.to_string())).transpose()?;
        }
        if max_zoom.is_none() {
            max_zoom = hi.map(|z| parse_zoom("maxzoom", &z.to_string())).transpose()?;
        }
    }

    let max_zoom = max_zoom
        .ok_or_else(|| StoreError::Metadata("no maxzoom and no tiles to derive it".to_string()))?;
    let min_zoom = min_zoom.unwrap_or(0).min(max_zoom);

    Ok(StoreMetadata {
        min_zoom,
        max_zoom,
        name: entries.get("name").cloned(),
        format: entries.get("format").cloned(),
    })
}

fn parse_zoom(key: &str, value: &str) -> Result<u8, StoreError> {
    value
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|z| *z <= MAX_ZOOM)
        .ok_or_else(|| StoreError::Metadata(format!("{key} '{value}' is not a valid zoom level")))
}
