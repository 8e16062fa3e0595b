use reqwest::{Client, StatusCode};
use serial_test::serial;
use std::time::{Duration, Instant};

use crate::common::{spawn_upstream, Item};
use livescore_shared::services::fetch::{fetch_batch, BatchFetcher, BatchSpec, FetchError, FetchSpec};
use livescore_shared::services::metrics::FeedMetrics;

// =============================================================================
// INTEGRATION TESTS - BATCH FETCH PIPELINE
// =============================================================================

fn item_urls(base: &str, ids: impl IntoIterator<Item = u32>) -> Vec<String> {
    ids.into_iter().map(|id| format!("{}/items/{}", base, id)).collect()
}

#[tokio::test]
async fn test_batch_returns_every_item() {
    let (base, hits) = spawn_upstream().await;
    let client = Client::new();

    let spec = BatchSpec::from_urls(item_urls(&base, 1..=20), None, Some(StatusCode::OK))
        .with_concurrency(4);
    let items: Vec<Item> = fetch_batch(&client, spec).await.unwrap();

    assert_eq!(items.len(), 20);
    let mut ids: Vec<u32> = items.iter().map(|i| i.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    assert_eq!(hits.count(), 20);
}

#[tokio::test]
async fn test_batch_with_more_workers_than_urls() {
    let (base, _) = spawn_upstream().await;
    let client = Client::new();

    let spec = BatchSpec::from_urls(item_urls(&base, 1..=3), None, None).with_concurrency(16);
    let items: Vec<Item> = fetch_batch(&client, spec).await.unwrap();
    assert_eq!(items.len(), 3);
}

#[tokio::test]
async fn test_empty_batch_is_ok() {
    let client = Client::new();
    let items: Vec<Item> = fetch_batch(&client, BatchSpec::new(vec![])).await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_status_mismatch_is_dropped_then_short_batch() {
    let (base, hits) = spawn_upstream().await;
    let client = Client::new();

    let mut urls = item_urls(&base, 1..=3);
    urls.push(format!("{}/status/500", base));
    let spec = BatchSpec::from_urls(urls, None, Some(StatusCode::OK)).with_concurrency(2);

    let err = fetch_batch::<Item>(&client, spec).await.unwrap_err();
    match err {
        FetchError::ShortBatch { requested, received } => {
            assert_eq!(requested, 4);
            assert_eq!(received, 3);
        }
        other => panic!("Expected ShortBatch, got {:?}", other),
    }
    // The mismatch is soft: every request still went out
    assert_eq!(hits.count(), 4);
}

#[tokio::test]
async fn test_per_request_expected_status() {
    let (base, _) = spawn_upstream().await;
    let client = Client::new();

    let requests = vec![
        FetchSpec::new(format!("{}/items/1", base)).expect_status(StatusCode::OK),
        FetchSpec::new(format!("{}/status/404", base)).expect_status(StatusCode::NOT_FOUND),
        FetchSpec::new(format!("{}/status/500", base)),
    ];
    let items: Vec<Item> = fetch_batch(&client, BatchSpec::new(requests).with_concurrency(2))
        .await
        .unwrap();
    assert_eq!(items.len(), 3);
}

#[tokio::test]
async fn test_decode_failure_aborts_batch() {
    let (base, _) = spawn_upstream().await;
    let client = Client::new();

    let mut urls = item_urls(&base, 1..=5);
    urls.insert(2, format!("{}/broken", base));
    let spec = BatchSpec::from_urls(urls, None, Some(StatusCode::OK)).with_concurrency(3);

    let err = fetch_batch::<Item>(&client, spec).await.unwrap_err();
    match err {
        FetchError::Decode { url, .. } => assert!(url.ends_with("/broken")),
        other => panic!("Expected Decode, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unbuildable_request_counts_as_missing() {
    let (base, _) = spawn_upstream().await;
    let client = Client::new();

    let requests = vec![
        FetchSpec::new(format!("{}/items/1", base)),
        FetchSpec::new("::not a url::"),
    ];
    let err = fetch_batch::<Item>(&client, BatchSpec::new(requests)).await.unwrap_err();
    assert!(matches!(err, FetchError::ShortBatch { requested: 2, received: 1 }));
}

#[tokio::test]
async fn test_mutator_applies_to_every_request() {
    let (base, _) = spawn_upstream().await;
    let client = Client::new();

    let urls = vec![format!("{}/secured", base); 4];
    let mutator: livescore_shared::services::fetch::RequestMutator =
        std::sync::Arc::new(|req: reqwest::RequestBuilder| req.header("x-api-key", "secret"));
    let spec = BatchSpec::from_urls(urls, Some(mutator), Some(StatusCode::OK)).with_concurrency(2);

    let items: Vec<Item> = fetch_batch(&client, spec).await.unwrap();
    assert_eq!(items.len(), 4);
    assert!(items.iter().all(|i| i.name == "secured"));
}

#[serial]
#[tokio::test]
async fn test_rate_cap_is_global_across_workers() {
    let (base, hits) = spawn_upstream().await;
    let client = Client::new();

    // 5 rps x 2 workers = 10 requests/second, one every 100ms
    let spec = BatchSpec::from_urls(item_urls(&base, 1..=6), None, Some(StatusCode::OK))
        .with_concurrency(2)
        .with_rps(5);

    let start = Instant::now();
    let items: Vec<Item> = fetch_batch(&client, spec).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(items.len(), 6);
    // First release is immediate, five more wait one period each
    assert!(elapsed >= Duration::from_millis(450), "Batch finished too fast: {:?}", elapsed);

    let stamps = hits.timestamps();
    let span = *stamps.last().unwrap() - stamps[0];
    assert!(span >= Duration::from_millis(400), "Upstream saw requests too close: {:?}", span);

    // Never more than rps x concurrency requests inside any one-second window
    for (i, first) in stamps.iter().enumerate() {
        let in_window = stamps[i..]
            .iter()
            .take_while(|t| t.duration_since(*first) < Duration::from_secs(1))
            .count();
        assert!(in_window <= 10, "{} requests inside one second", in_window);
    }
}

#[serial]
#[tokio::test]
async fn test_rate_cap_holds_when_upstream_is_slow() {
    let (base, hits) = spawn_upstream().await;
    let client = Client::new();

    // Both workers stall on the first two ids; the backlog must not go out in a burst
    let urls: Vec<String> = (1..=20).map(|id| format!("{}/slow/{}", base, id)).collect();
    let spec = BatchSpec::from_urls(urls, None, Some(StatusCode::OK))
        .with_concurrency(2)
        .with_rps(5);

    let items: Vec<Item> = fetch_batch(&client, spec).await.unwrap();
    assert_eq!(items.len(), 20);

    let stamps = hits.timestamps();
    assert_eq!(stamps.len(), 20);
    // 10ms of slack for scheduling jitter between client and fake upstream
    let window = Duration::from_millis(990);
    for (i, first) in stamps.iter().enumerate() {
        let in_window = stamps[i..]
            .iter()
            .take_while(|t| t.duration_since(*first) < window)
            .count();
        assert!(in_window <= 10, "{} requests inside one second", in_window);
    }
    // Requests released after the stall are still spaced one period apart
    for pair in stamps[2..].windows(2) {
        assert!(
            pair[1] - pair[0] >= Duration::from_millis(50),
            "Burst after stall: {:?}",
            pair[1] - pair[0]
        );
    }
}

#[serial]
#[tokio::test]
async fn test_unlimited_rate_does_not_pace() {
    let (base, _) = spawn_upstream().await;
    let client = Client::new();

    let spec = BatchSpec::from_urls(item_urls(&base, 1..=10), None, None)
        .with_concurrency(5)
        .with_rps(0);

    let start = Instant::now();
    let items: Vec<Item> = fetch_batch(&client, spec).await.unwrap();
    assert_eq!(items.len(), 10);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_batch_metrics_record_outcomes() {
    let (base, _) = spawn_upstream().await;
    let metrics = FeedMetrics::new().unwrap();
    let fetcher = BatchFetcher::new(Client::new()).with_metrics(metrics.clone());

    let mut urls = item_urls(&base, 1..=2);
    urls.push(format!("{}/status/502", base));
    let spec = BatchSpec::from_urls(urls, None, Some(StatusCode::OK)).with_concurrency(2);

    let result = fetcher.fetch::<Item>(spec).await;
    assert!(matches!(result, Err(FetchError::ShortBatch { .. })));

    assert_eq!(metrics.batch_requests_total.with_label_values(&["ok"]).get(), 2.0);
    assert_eq!(
        metrics.batch_requests_total.with_label_values(&["status_mismatch"]).get(),
        1.0
    );
    assert_eq!(metrics.batch_duration_seconds.get_sample_count(), 1);
}
