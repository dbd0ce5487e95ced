//! Source registry.
//!
//! Every tile source the server exposes is opened and described once at
//! startup. Requests only ever look sources up; nothing is opened lazily.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             BundleService               │
//! └────────────────────┬────────────────────┘
//!                      │ resolve(id)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            SourceRegistry               │
//! │   id → SourceDescriptor (store, zooms)  │
//! └────────────────────┬────────────────────┘
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            TileStore Trait              │
//! └─────────────────────────────────────────┘
//! ```

mod registry;

pub use registry::{SourceDescriptor, SourceRegistry, DEFAULT_SOURCE_ID};
