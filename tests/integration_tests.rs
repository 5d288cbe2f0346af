//! Integration tests driving the client against a wiremock upstream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use datagovin::{Client, Config, Error, FetchParams};
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESOURCE: &str = "9ef84268-d588-465a-a308-a864a43d0070";

fn test_config(server: &MockServer) -> Config {
    Config {
        api_key: Some("test-key".to_string()),
        base_url: server.uri(),
        initial_retry_delay: Duration::from_millis(10),
        max_retry_delay: Duration::from_millis(50),
        ..Config::default()
    }
}

fn test_client(server: &MockServer) -> Client {
    Client::new(test_config(server)).unwrap()
}

fn record(state: &str, crop: &str, production: f64) -> serde_json::Value {
    json!({ "state": state, "crop": crop, "production": production })
}

/// Response body in the upstream's shape, including its legacy `field` key
/// and a `count` key the client ignores.
fn dataset_body(total: u64, records: &[serde_json::Value]) -> serde_json::Value {
    json!({
        "total": total,
        "count": records.len(),
        "field": [
            { "id": "state", "type": "keyword" },
            { "id": "crop", "type": "keyword" },
            { "id": "production", "type": "double" },
        ],
        "records": records,
    })
}

#[tokio::test]
async fn test_get_dataset_returns_slice() {
    let server = MockServer::start().await;

    let records = [
        record("Kerala", "Rice", 600.5),
        record("Punjab", "Wheat", 1820.0),
    ];
    Mock::given(method("GET"))
        .and(path(format!("/resource/{RESOURCE}")))
        .and(query_param("api-key", "test-key"))
        .and(query_param("format", "json"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset_body(42, &records)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let slice = client
        .get_dataset(RESOURCE, &FetchParams::new().with_limit(5))
        .await
        .unwrap();

    assert_eq!(slice.resource_id, RESOURCE);
    assert_eq!(slice.total_records, 42);
    assert_eq!(slice.offset, 0);
    assert_eq!(slice.limit, 5);
    assert_eq!(slice.records.len(), 2);
    assert_eq!(slice.fields.len(), 3);
    assert_eq!(slice.records[0]["state"], json!("Kerala"));
}

#[tokio::test]
async fn test_filters_are_forwarded_upstream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/resource/{RESOURCE}")))
        .and(query_param("filters[state]", "Kerala"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(dataset_body(1, &[record("Kerala", "Rice", 600.5)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let response = client
        .fetch(RESOURCE, &FetchParams::new().with_filter("state", "Kerala"))
        .await
        .unwrap();

    assert_eq!(response.records.len(), 1);
}

#[tokio::test]
async fn test_resource_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such resource"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.fetch("does-not-exist", &FetchParams::new()).await;

    match result {
        Err(Error::ResourceNotFound { resource_id }) => {
            assert_eq!(resource_id, "does-not-exist");
        }
        _ => panic!("Expected ResourceNotFound, got {:?}", result),
    }
}

#[tokio::test]
async fn test_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.fetch(RESOURCE, &FetchParams::new()).await;

    match result {
        Err(Error::Authentication { status, message }) => {
            assert_eq!(status.as_u16(), 401);
            assert!(message.contains("invalid api key"));
        }
        _ => panic!("Expected Authentication, got {:?}", result),
    }
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;

    // expect(1) proves a 400 short-circuits the retry loop.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.fetch(RESOURCE, &FetchParams::new()).await;

    match result {
        Err(Error::Upstream { status, .. }) => assert_eq!(status.as_u16(), 400),
        _ => panic!("Expected Upstream, got {:?}", result),
    }
}

#[tokio::test]
async fn test_transient_errors_are_retried_to_success() {
    let server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    let records = [record("Kerala", "Rice", 600.5)];
    let body = dataset_body(1, &records);

    // First two attempts fail with 503, the third succeeds.
    Mock::given(method("GET"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(503).set_body_string("maintenance")
            } else {
                ResponseTemplate::new(200).set_body_json(&body)
            }
        })
        .mount(&server)
        .await;

    let client = test_client(&server);
    let response = client.fetch(RESOURCE, &FetchParams::new()).await.unwrap();

    assert_eq!(response.records.len(), 1);
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retries_exhausted_wraps_last_error() {
    let server = MockServer::start().await;

    // max_retries: 2 allows 3 attempts in total.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let client = Client::new(Config {
        max_retries: 2,
        ..test_config(&server)
    })
    .unwrap();
    let result = client.fetch(RESOURCE, &FetchParams::new()).await;

    match result {
        Err(Error::RetriesExhausted {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 3);
            assert!(
                matches!(*last_error, Error::Upstream { status, .. } if status.as_u16() == 500)
            );
        }
        _ => panic!("Expected RetriesExhausted, got {:?}", result),
    }
}

#[tokio::test]
async fn test_retry_after_hint_is_honored() {
    let server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    let records = [record("Kerala", "Rice", 600.5)];
    let body = dataset_body(1, &records);

    Mock::given(method("GET"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count == 0 {
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "1")
                    .set_body_string("rate limited")
            } else {
                ResponseTemplate::new(200).set_body_json(&body)
            }
        })
        .mount(&server)
        .await;

    let client = test_client(&server);
    let start = std::time::Instant::now();
    let response = client.fetch(RESOURCE, &FetchParams::new()).await.unwrap();

    assert_eq!(response.records.len(), 1);
    assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
    // The hint (1s) overrides the configured 10ms backoff.
    assert!(start.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn test_undecodable_body_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy page</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.fetch(RESOURCE, &FetchParams::new()).await;

    match result {
        Err(Error::Decode { status, .. }) => assert_eq!(status.as_u16(), 200),
        _ => panic!("Expected Decode, got {:?}", result),
    }
}

#[tokio::test]
async fn test_identical_fetches_hit_the_cache() {
    let server = MockServer::start().await;

    let records = [record("Kerala", "Rice", 600.5)];
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset_body(1, &records)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let params = FetchParams::new().with_limit(5);
    let first = client.fetch(RESOURCE, &params).await.unwrap();
    let second = client.fetch(RESOURCE, &params).await.unwrap();

    assert_eq!(first.records, second.records);

    let stats = client.cache_statistics().stats.unwrap();
    assert_eq!(stats.size, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hit_rate, "50.00%");
}

#[tokio::test]
async fn test_distinct_windows_do_not_share_cache_entries() {
    let server = MockServer::start().await;

    let records = [record("Kerala", "Rice", 600.5)];
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset_body(100, &records)))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server);
    client.fetch(RESOURCE, &FetchParams::new()).await.unwrap();
    client
        .fetch(RESOURCE, &FetchParams::new().with_offset(10))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_clear_cache_forces_refetch() {
    let server = MockServer::start().await;

    let records = [record("Kerala", "Rice", 600.5)];
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset_body(1, &records)))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server);
    client.fetch(RESOURCE, &FetchParams::new()).await.unwrap();
    client.clear_cache();
    client.fetch(RESOURCE, &FetchParams::new()).await.unwrap();
}

#[tokio::test]
async fn test_disabled_cache_always_fetches() {
    let server = MockServer::start().await;

    let records = [record("Kerala", "Rice", 600.5)];
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset_body(1, &records)))
        .expect(2)
        .mount(&server)
        .await;

    let client = Client::new(Config {
        cache_enabled: false,
        ..test_config(&server)
    })
    .unwrap();
    client.fetch(RESOURCE, &FetchParams::new()).await.unwrap();
    client.fetch(RESOURCE, &FetchParams::new()).await.unwrap();

    let stats = client.cache_statistics();
    assert!(!stats.cache_enabled);
    assert!(stats.stats.is_none());

    // The disabled marker serializes without counter fields.
    let as_json = serde_json::to_value(&stats).unwrap();
    assert_eq!(as_json, json!({ "cache_enabled": false }));
}

#[tokio::test]
async fn test_concurrent_identical_misses_both_fetch() {
    let server = MockServer::start().await;

    let records = [record("Kerala", "Rice", 600.5)];
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(dataset_body(1, &records))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let params = FetchParams::new();
    let (first, second) = tokio::join!(
        client.fetch(RESOURCE, &params),
        client.fetch(RESOURCE, &params),
    );
    assert_eq!(first.unwrap().records, second.unwrap().records);

    // Both calls miss, and the second insert replaces the first.
    let stats = client.cache_statistics().stats.unwrap();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.size, 1);
}

#[tokio::test]
async fn test_missing_api_key_fails_before_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = Client::new(Config {
        api_key: None,
        ..test_config(&server)
    })
    .unwrap();
    let result = client.fetch(RESOURCE, &FetchParams::new()).await;

    assert!(matches!(result, Err(Error::MissingApiKey)));
}

#[tokio::test]
async fn test_invalid_parameters_fail_before_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);

    let cases: Vec<(&str, Result<(), Error>)> = vec![
        (
            "resource_id",
            client
                .fetch("  ", &FetchParams::new())
                .await
                .map(|_| ()),
        ),
        (
            "limit",
            client
                .fetch(RESOURCE, &FetchParams::new().with_limit(0))
                .await
                .map(|_| ()),
        ),
        (
            "limit",
            client
                .fetch(RESOURCE, &FetchParams::new().with_limit(101))
                .await
                .map(|_| ()),
        ),
        (
            "page",
            client.paginate_dataset(RESOURCE, 0, 10).await.map(|_| ()),
        ),
        (
            "field",
            client
                .filter_dataset(RESOURCE, "", "Kerala", None)
                .await
                .map(|_| ()),
        ),
    ];

    for (expected_param, result) in cases {
        match result {
            Err(Error::InvalidParameter { param, .. }) => assert_eq!(param, expected_param),
            other => panic!("Expected InvalidParameter for {expected_param}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_paginate_builds_offset_and_page_info() {
    let server = MockServer::start().await;

    let records = [
        record("Kerala", "Rice", 600.5),
        record("Punjab", "Wheat", 1820.0),
    ];
    // Page 3 of size 20 lands at offset 40.
    Mock::given(method("GET"))
        .and(path(format!("/resource/{RESOURCE}")))
        .and(query_param("offset", "40"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset_body(100, &records)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let page = client.paginate_dataset(RESOURCE, 3, 20).await.unwrap();

    assert_eq!(page.pagination.current_page, 3);
    assert_eq!(page.pagination.page_size, 20);
    assert_eq!(page.pagination.total_records, 100);
    assert_eq!(page.pagination.total_pages, 5);
    assert!(page.pagination.has_next);
    assert!(page.pagination.has_previous);
    assert_eq!(page.records.len(), 2);
}

#[tokio::test]
async fn test_filter_dataset_matches_locally() {
    let server = MockServer::start().await;

    let records = [
        record("Kerala", "Rice", 600.5),
        record("Punjab", "Wheat", 1820.0),
        record("Kerala", "Coconut", 950.0),
        record("Assam", "Tea", 170.3),
        record("Kerala", "Rubber", 540.0),
    ];
    // The upstream request carries no filters; matching happens client-side.
    Mock::given(method("GET"))
        .and(path(format!("/resource/{RESOURCE}")))
        .and(query_param_is_missing("filters[state]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset_body(5, &records)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let filtered = client
        .filter_dataset(RESOURCE, "state", "Kerala", Some(10))
        .await
        .unwrap();

    assert_eq!(filtered.matched_records, 3);
    assert_eq!(filtered.filter.get("state"), Some(&"Kerala".to_string()));
    assert!(filtered
        .records
        .iter()
        .all(|r| r["state"] == json!("Kerala")));
}

#[tokio::test]
async fn test_summary_probes_one_record() {
    let server = MockServer::start().await;

    let records = [record("Kerala", "Rice", 600.5)];
    Mock::given(method("GET"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset_body(2500, &records)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let summary = client.get_dataset_summary(RESOURCE).await.unwrap();

    assert_eq!(summary.total_records, 2500);
    assert_eq!(summary.field_count, 3);
    assert_eq!(summary.fields, vec!["state", "crop", "production"]);
    assert_eq!(summary.sample_record.unwrap()["state"], json!("Kerala"));
}

#[tokio::test]
async fn test_summary_of_empty_dataset_has_no_sample() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset_body(0, &[])))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let summary = client.get_dataset_summary(RESOURCE).await.unwrap();

    assert_eq!(summary.total_records, 0);
    assert!(summary.sample_record.is_none());
}

#[tokio::test]
async fn test_fields_are_inferred_when_schema_is_missing() {
    let server = MockServer::start().await;

    // No `field` key in the payload at all.
    let body = json!({
        "total": 1,
        "records": [{ "state": "Kerala", "production": 12.5 }],
    });
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let schema = client.get_dataset_fields(RESOURCE).await.unwrap();

    assert_eq!(schema.field_count, 2);
    let production = schema.fields.iter().find(|f| f.id == "production").unwrap();
    assert_eq!(production.ty, "number");
    let state = schema.fields.iter().find(|f| f.id == "state").unwrap();
    assert_eq!(state.ty, "string");
}

#[tokio::test]
async fn test_rate_limiter_delays_calls_past_the_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dataset_body(100, &[])))
        .expect(3)
        .mount(&server)
        .await;

    let client = Client::new(Config {
        rate_limit_calls: 2,
        rate_limit_period: Duration::from_millis(300),
        ..test_config(&server)
    })
    .unwrap();

    // Distinct offsets keep all three calls out of the cache.
    let start = std::time::Instant::now();
    for offset in [0, 10, 20] {
        client
            .fetch(RESOURCE, &FetchParams::new().with_offset(offset))
            .await
            .unwrap();
    }

    // The third call waits for the first admission to age out.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(250), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn test_server_info_reports_configuration() {
    let server = MockServer::start().await;
    let client = test_client(&server);

    let info = client.server_info();
    assert_eq!(info.server, "datagovin");
    assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    assert!(info.api_key_configured);
    assert_eq!(info.configuration.rate_limit, "100 calls per 60s");

    // The key itself never appears in the serialized form.
    let as_json = serde_json::to_string(&info).unwrap();
    assert!(!as_json.contains("test-key"));
}
