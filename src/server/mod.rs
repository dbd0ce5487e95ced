//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │         GET|HEAD /{source_id}/{zoom}/{x}/{y}.{ext}              │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (parse, respond, errors) │  │  (router, CORS, tracing)    │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    bundle_handler, health_handler, root_handler, sources_handler, AppState, BundlePathParams,
    ErrorResponse, HealthResponse, SourceResponse, SourcesResponse, ROOT_MESSAGE,
    SIZE_CACHE_HIT_HEADER, TILE_COUNT_HEADER,
};
pub use routes::{create_router, RouterConfig, DEFAULT_CACHE_MAX_AGE};
