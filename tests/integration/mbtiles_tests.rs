//! End-to-end tests over real MBTiles files.
//!
//! Tests verify:
//! - Sources opened from SQLite files serve bundles with XYZ entry names
//! - Zoom bounds come from metadata or from the tiles table
//! - Startup failures for missing files and duplicate ids

use axum::http::StatusCode;
use serde_json::json;
use tempfile::TempDir;

use bulk_tile_server::bundle::BundleService;
use bulk_tile_server::error::StartupError;
use bulk_tile_server::server::{create_router, RouterConfig};
use bulk_tile_server::source::SourceRegistry;

use super::test_utils::{create_mbtiles, get, head, tar_entries};

#[tokio::test]
async fn test_bundle_from_mbtiles() {
    let dir = TempDir::new().unwrap();
    let path = create_mbtiles(
        dir.path(),
        "world.mbtiles",
        &[
            ("name", "World"),
            ("format", "png"),
            ("minzoom", "0"),
            ("maxzoom", "11"),
        ],
        &[
            (10, 5, 5, &b"root"[..]),
            (11, 10, 11, &b"child-a"[..]),
            (11, 11, 10, &b"child-b"[..]),
            (10, 5, 6, &b"neighbour"[..]),
        ],
    );

    let registry = SourceRegistry::open_mbtiles([("default".to_string(), path)])
        .await
        .unwrap();
    let router = create_router(
        BundleService::new(registry, 10),
        RouterConfig::new().with_tracing(false),
    );

    let response = get(&router, "/default/10/5/5.tar").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        tar_entries(&response.body),
        vec![
            ("10/5/5".to_string(), b"root".to_vec()),
            ("11/10/11".to_string(), b"child-a".to_vec()),
            ("11/11/10".to_string(), b"child-b".to_vec()),
        ]
    );

    let probe = head(&router, "/default/10/5/5.tar").await;
    assert_eq!(probe.content_length(), Some(response.body.len() as u64));
    assert_eq!(probe.header("x-size-cache-hit"), Some("true"));
}

#[tokio::test]
async fn test_sources_listing_from_files() {
    let dir = TempDir::new().unwrap();
    let named = create_mbtiles(
        dir.path(),
        "named.mbtiles",
        &[("name", "Named"), ("minzoom", "2"), ("maxzoom", "14")],
        &[(2, 0, 0, &b"t"[..])],
    );
    // No zoom metadata: bounds come from the tiles table
    let derived = create_mbtiles(
        dir.path(),
        "derived.mbtiles",
        &[],
        &[(3, 0, 0, &b"a"[..]), (9, 1, 1, &b"b"[..])],
    );

    let registry = SourceRegistry::open_mbtiles([
        ("named".to_string(), named),
        ("derived".to_string(), derived),
    ])
    .await
    .unwrap();
    let router = create_router(
        BundleService::new(registry, 10),
        RouterConfig::new().with_tracing(false),
    );

    let response = get(&router, "/sources").await;
    assert_eq!(
        response.json(),
        json!({
            "sources": [
                {"id": "derived", "min_zoom": 3, "max_zoom": 9},
                {"id": "named", "min_zoom": 2, "max_zoom": 14, "name": "Named"}
            ]
        })
    );
}

#[tokio::test]
async fn test_missing_file_fails_startup() {
    let dir = TempDir::new().unwrap();
    let result = SourceRegistry::open_mbtiles([(
        "default".to_string(),
        dir.path().join("absent.mbtiles"),
    )])
    .await;

    match result {
        Err(StartupError::Source { id, .. }) => assert_eq!(id, "default"),
        other => panic!("expected source error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_duplicate_source_id_fails_startup() {
    let dir = TempDir::new().unwrap();
    let path = create_mbtiles(dir.path(), "a.mbtiles", &[], &[(0, 0, 0, &b"t"[..])]);

    let result = SourceRegistry::open_mbtiles([
        ("default".to_string(), path.clone()),
        ("default".to_string(), path),
    ])
    .await;

    assert!(matches!(result, Err(StartupError::DuplicateSource(id)) if id == "default"));
}
