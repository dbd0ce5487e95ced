//! HTTP request handlers for the bulk tile API.
//!
//! # Endpoints
//!
//! - `GET|HEAD /{source_id}/{zoom}/{x}/{y}.{ext}` - Tile bundle
//! - `GET /` - Liveness message
//! - `GET /health` - Health check
//! - `GET /sources` - Configured sources

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::bundle::{BundleFormat, BundleRequest, BundleService};
use crate::error::BundleError;

/// Header reporting whether a HEAD was answered from the size cache.
pub const SIZE_CACHE_HIT_HEADER: HeaderName = HeaderName::from_static("x-size-cache-hit");

/// Header reporting the number of archive entries.
pub const TILE_COUNT_HEADER: HeaderName = HeaderName::from_static("x-tile-count");

/// Body of `GET /`.
pub const ROOT_MESSAGE: &str = "Bulk tile server is running";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the bundle service.
///
/// This is passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// The service building bulk archives
    pub bundle_service: Arc<BundleService>,

    /// Cache-Control max-age for archive responses, in seconds
    pub cache_max_age: u32,
}

impl AppState {
    /// Create application state with the default cache max-age (1 hour).
    pub fn new(bundle_service: BundleService) -> Self {
        Self::with_cache_max_age(bundle_service, 3600)
    }

    pub fn with_cache_max_age(bundle_service: BundleService, cache_max_age: u32) -> Self {
        Self {
            bundle_service: Arc::new(bundle_service),
            cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for bundle requests.
///
/// Extracted from: `/{source_id}/{zoom}/{x}/{filename}` where filename is
/// `{y}.{ext}`. Numbers stay strings here so a malformed path is a plain 404
/// rather than an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct BundlePathParams {
    pub source_id: String,
    pub zoom: String,
    pub x: String,
    pub filename: String,
}

impl BundlePathParams {
    /// Parse into a bundle request.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::MalformedPath`] when zoom, x or y is not a
    /// decimal integer that fits in `u64`, or the filename has no extension.
    pub fn to_request(&self) -> Result<BundleRequest, BundleError> {
        let (y, extension) = self
            .filename
            .split_once('.')
            .ok_or(BundleError::MalformedPath)?;

        let valid_extension = !extension.is_empty()
            && extension
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !valid_extension {
            return Err(BundleError::MalformedPath);
        }

        Ok(BundleRequest::new(
            self.source_id.clone(),
            parse_number(&self.zoom)?,
            parse_number(&self.x)?,
            parse_number(y)?,
            extension,
        ))
    }
}

fn parse_number(segment: &str) -> Result<u64, BundleError> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BundleError::MalformedPath);
    }
    segment.parse().map_err(|_| BundleError::MalformedPath)
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error body: `{"error": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// One entry of the sources listing.
#[derive(Debug, Serialize)]
pub struct SourceResponse {
    pub id: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Response from the sources endpoint.
#[derive(Debug, Serialize)]
pub struct SourcesResponse {
    pub sources: Vec<SourceResponse>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert BundleError to HTTP response.
///
/// Logging follows severity:
/// - 5xx errors at ERROR
/// - 400 at WARN
/// - 404 at DEBUG (common and expected)
impl IntoResponse for BundleError {
    fn into_response(self) -> Response {
        let status = match &self {
            BundleError::SourceNotFound { .. }
            | BundleError::UnsupportedFormat { .. }
            | BundleError::MalformedPath => StatusCode::NOT_FOUND,
            BundleError::ZoomTooLow { .. } | BundleError::InvalidCoordinate { .. } => {
                StatusCode::BAD_REQUEST
            }
            BundleError::Archive(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), "Server error: {}", message);
        } else if status == StatusCode::NOT_FOUND {
            debug!(status = status.as_u16(), "Not found: {}", message);
        } else {
            warn!(status = status.as_u16(), "Client error: {}", message);
        }

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle bulk tile requests.
///
/// # Endpoint
///
/// `GET|HEAD /{source_id}/{zoom}/{x}/{y}.{ext}`
///
/// # Path Parameters
///
/// - `source_id`: Source identifier
/// - `zoom`, `x`, `y`: Root tile coordinate (XYZ scheme)
/// - `ext`: `tar`, `tar.gz` or `tar.br`
///
/// # Response
///
/// - `200 OK`: Archive of the root tile and all stored descendants
/// - `400 Bad Request`: Zoom below the minimum, or coordinate outside the grid
/// - `404 Not Found`: Unknown source or extension
///
/// # Headers
///
/// - `Content-Type`: `application/x-tar`, `application/x-tar+gzip` or
///   `application/x-tar+brotli`
/// - `Content-Length`: Body length (also for HEAD)
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Size-Cache-Hit: true|false`
/// - `X-Tile-Count`: Number of entries (when the archive was built)
///
/// A HEAD whose size is already cached is answered without touching the
/// store. Any other request builds the archive and records its size.
pub async fn bundle_handler(
    State(state): State<AppState>,
    method: Method,
    Path(params): Path<BundlePathParams>,
) -> Result<Response, BundleError> {
    let request = params.to_request()?;
    let service = &state.bundle_service;
    let validated = service.validate(&request)?;

    if method == Method::HEAD {
        if let Some(len) = service.cached_size(&validated).await {
            debug!(
                source = validated.source.id(),
                tile = %validated.tile(),
                format = %validated.format,
                len,
                "Answered HEAD from size cache"
            );
            let headers = bundle_headers(&state, validated.format, len, true, None);
            return Ok((StatusCode::OK, headers, Body::empty()).into_response());
        }
    }

    let bundle = service.build(&validated).await?;
    let headers = bundle_headers(
        &state,
        bundle.format,
        bundle.data.len() as u64,
        false,
        Some(bundle.stats.tiles_written),
    );

    Ok((StatusCode::OK, headers, Body::from(bundle.data)).into_response())
}

fn bundle_headers(
    state: &AppState,
    format: BundleFormat,
    content_length: u64,
    size_cache_hit: bool,
    tile_count: Option<usize>,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", state.cache_max_age)) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    headers.insert(
        SIZE_CACHE_HIT_HEADER,
        HeaderValue::from_static(if size_cache_hit { "true" } else { "false" }),
    );
    if let Some(count) = tile_count {
        headers.insert(TILE_COUNT_HEADER, HeaderValue::from(count));
    }
    headers
}

/// Handle `GET /` with a plain-text liveness message.
pub async fn root_handler() -> &'static str {
    ROOT_MESSAGE
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body `{"status": "OK"}`.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
    })
}

/// Handle sources list requests.
///
/// # Endpoint
///
/// `GET /sources`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "sources": [
///     { "id": "default", "min_zoom": 0, "max_zoom": 14, "name": "OpenMapTiles" }
///   ]
/// }
/// ```
pub async fn sources_handler(State(state): State<AppState>) -> Json<SourcesResponse> {
    let sources = state
        .bundle_service
        .registry()
        .sources()
        .iter()
        .map(|source| SourceResponse {
            id: source.id().to_string(),
            min_zoom: source.min_zoom(),
            max_zoom: source.max_zoom(),
            name: source.metadata().name.clone(),
        })
        .collect();

    Json(SourcesResponse { sources })
}
