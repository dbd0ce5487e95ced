//! Tile store layer.
//!
//! The bulk pipeline only sees the [`TileStore`] trait: metadata read once at
//! startup and one `get_tile` call per descendant coordinate. [`MbtilesStore`]
//! is the on-disk backend.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            SourceRegistry               │
//! └────────────────────┬────────────────────┘
//!                      │ Arc<dyn TileStore>
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            TileStore Trait              │
//! └────────────────────┬────────────────────┘
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   MbtilesStore (SQLite, TMS rows)       │
//! └─────────────────────────────────────────┘
//! ```

mod mbtiles;
mod tile_store;

pub use mbtiles::MbtilesStore;
pub use tile_store::{StoreMetadata, TileStore};
