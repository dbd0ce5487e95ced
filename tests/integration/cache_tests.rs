//! Size cache and concurrency tests.
//!
//! These tests verify that:
//! - HEAD after GET answers with the cached length without store lookups
//! - A HEAD miss builds the archive and fills the cache
//! - Formats of the same coordinate are cached separately
//! - Concurrent requests produce identical, uncorrupted bodies

use std::time::Duration;

use axum::http::StatusCode;

use super::test_utils::{
    count, get, gunzip, head, router_with_store, tar_entries, MockTileStore,
};

#[tokio::test]
async fn test_head_after_get_uses_cached_length() {
    let store = MockTileStore::new(11)
        .with_tile(10, 5, 5, &b"root"[..])
        .with_tile(11, 10, 10, &b"child"[..]);
    let counter = store.request_counter();
    let router = router_with_store(store, 10).await;

    let body = get(&router, "/default/10/5/5.tar").await;
    assert_eq!(body.status, StatusCode::OK);
    let lookups_after_get = count(&counter);
    assert_eq!(lookups_after_get, 5);

    let response = head(&router, "/default/10/5/5.tar").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_length(), Some(body.body.len() as u64));
    assert_eq!(response.header("x-size-cache-hit"), Some("true"));
    assert_eq!(response.header("content-type"), Some("application/x-tar"));
    assert!(response.body.is_empty());

    // Answered without touching the store
    assert_eq!(count(&counter), lookups_after_get);
}

#[tokio::test]
async fn test_head_miss_builds_and_caches() {
    let store = MockTileStore::new(10).with_tile(10, 5, 5, &b"root"[..]);
    let counter = store.request_counter();
    let router = router_with_store(store, 10).await;

    let first = head(&router, "/default/10/5/5.tar.gz").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.header("x-size-cache-hit"), Some("false"));
    assert!(first.body.is_empty());
    assert_eq!(count(&counter), 1);

    let second = head(&router, "/default/10/5/5.tar.gz").await;
    assert_eq!(second.header("x-size-cache-hit"), Some("true"));
    assert_eq!(second.content_length(), first.content_length());
    assert_eq!(count(&counter), 1);

    let body = get(&router, "/default/10/5/5.tar.gz").await;
    assert_eq!(Some(body.body.len() as u64), first.content_length());
}

#[tokio::test]
async fn test_get_always_rebuilds() {
    let store = MockTileStore::new(10).with_tile(10, 5, 5, &b"root"[..]);
    let counter = store.request_counter();
    let router = router_with_store(store, 10).await;

    get(&router, "/default/10/5/5.tar").await;
    let second = get(&router, "/default/10/5/5.tar").await;

    assert_eq!(second.header("x-size-cache-hit"), Some("false"));
    assert_eq!(count(&counter), 2);
}

#[tokio::test]
async fn test_formats_cached_separately() {
    let store = MockTileStore::new(11)
        .with_tile(10, 5, 5, vec![1u8; 4096])
        .with_tile(11, 10, 10, vec![2u8; 4096]);
    let counter = store.request_counter();
    let router = router_with_store(store, 10).await;

    let plain = get(&router, "/default/10/5/5.tar").await;
    let lookups = count(&counter);

    // Same coordinate, other format: not answered from the tar entry
    let gz_head = head(&router, "/default/10/5/5.tar.gz").await;
    assert_eq!(gz_head.header("x-size-cache-hit"), Some("false"));
    assert!(count(&counter) > lookups);
    assert_ne!(gz_head.content_length(), Some(plain.body.len() as u64));

    let gz = get(&router, "/default/10/5/5.tar.gz").await;
    assert_eq!(gz_head.content_length(), Some(gz.body.len() as u64));
}

#[tokio::test]
async fn test_validation_errors_on_head() {
    let router = router_with_store(MockTileStore::new(12), 10).await;

    let response = head(&router, "/default/5/1/1.tar").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = head(&router, "/missing/10/1/1.tar").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_requests_identical_bodies() {
    let store = MockTileStore::new(12)
        .with_tile(10, 5, 5, vec![0xAAu8; 3000])
        .with_tile(11, 10, 11, vec![0xBBu8; 700])
        .with_tile(12, 21, 22, vec![0xCCu8; 1500])
        .with_delay(Duration::from_millis(1));
    let router = router_with_store(store, 10).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            get(&router, "/default/10/5/5.tar.gz").await
        }));
    }

    let mut bodies = Vec::new();
    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        bodies.push(response.body);
    }

    for body in &bodies[1..] {
        assert_eq!(body, &bodies[0]);
    }

    let entries = tar_entries(&gunzip(&bodies[0]).await);
    assert_eq!(
        entries,
        vec![
            ("10/5/5".to_string(), vec![0xAAu8; 3000]),
            ("11/10/11".to_string(), vec![0xBBu8; 700]),
            ("12/21/22".to_string(), vec![0xCCu8; 1500]),
        ]
    );
}

#[tokio::test]
async fn test_concurrent_different_roots_do_not_mix() {
    let store = MockTileStore::new(10)
        .with_tile(10, 0, 0, &b"first"[..])
        .with_tile(10, 0, 1, &b"second"[..])
        .with_delay(Duration::from_millis(2));
    let router = router_with_store(store, 10).await;

    let (a, b) = tokio::join!(
        get(&router, "/default/10/0/0.tar"),
        get(&router, "/default/10/0/1.tar")
    );

    assert_eq!(
        tar_entries(&a.body),
        vec![("10/0/0".to_string(), b"first".to_vec())]
    );
    assert_eq!(
        tar_entries(&b.body),
        vec![("10/0/1".to_string(), b"second".to_vec())]
    );
}
