use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crm_sync::client::RequestMethod;
use crm_sync::close::{query, BatchFailure, BatchItem, CloseClient, DispatchOptions, SearchOptions};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common;

async fn close_client(server: &MockServer) -> CloseClient {
    CloseClient::with_config(
        common::api_root(server, "api/v1"),
        "api_integration",
        common::fast_retry(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_search_then_update_batch() {
    common::init();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/data/search/"))
        .and(body_partial_json(json!({"cursor": null})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "lead_1"}, {"id": "lead_2"}],
            "cursor": "next"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/data/search/"))
        .and(body_partial_json(json!({"cursor": "next"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "lead_3"}],
            "cursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/lead/lead_2/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [],
            "field-errors": {"status_id": "This status does not exist."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/lead/lead_3/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(6)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/lead/lead_1/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "lead_1", "status_id": "stat_new"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let close = close_client(&server).await;

    let leads = close
        .search(
            &query::field_condition("lead", "status_label", query::Condition::exact("Old")),
            SearchOptions::default().with_fields(["id"]).with_limit(200),
        )
        .await
        .unwrap();
    assert_eq!(leads.len(), 3);

    let items: Vec<BatchItem> = leads
        .iter()
        .map(|lead| {
            BatchItem::with_payload(
                format!("lead/{}/", lead["id"].as_str().unwrap()),
                json!({"status_id": "stat_new"}),
            )
        })
        .collect();

    let outcome = close
        .dispatch_all(RequestMethod::Put, items, DispatchOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.successes.len(), 1);
    assert_eq!(outcome.failures.len(), 2);

    let validation = outcome
        .failures
        .iter()
        .find(|f| f.is_validation())
        .unwrap();
    match validation {
        BatchFailure::Validation {
            index,
            field_errors,
            payload,
            ..
        } => {
            assert_eq!(*index, 1);
            assert!(field_errors.contains_key("status_id"));
            assert_eq!(payload.as_ref().unwrap()["status_id"], "stat_new");
        }
        BatchFailure::Hard { .. } => unreachable!(),
    }

    let hard = outcome
        .failures
        .iter()
        .find(|f| !f.is_validation())
        .unwrap();
    assert_eq!(hard.endpoint(), "lead/lead_3/");

    server.verify().await;
}

#[tokio::test]
async fn test_rate_limited_item_succeeds_after_backoff() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    Mock::given(method("PUT"))
        .and(path("/api/v1/opportunity/oppo_1/"))
        .respond_with(move |_: &wiremock::Request| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(429)
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"id": "oppo_1"}))
            }
        })
        .mount(&server)
        .await;

    let close = close_client(&server).await;
    let started = Instant::now();

    let outcome = close
        .dispatch_all(
            RequestMethod::Put,
            vec![BatchItem::with_payload(
                "opportunity/oppo_1/",
                json!({"value": 1000}),
            )],
            DispatchOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.successes.len(), 1);
    assert!(outcome.failures.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/lead/lead_gone/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Empty query result"})))
        .expect(1)
        .mount(&server)
        .await;

    let close = close_client(&server).await;
    let outcome = close.get_many(["lead/lead_gone/"]).await.unwrap();

    assert!(outcome.successes.is_empty());
    match &outcome.failures[0] {
        BatchFailure::Hard { error, .. } => assert!(error.is_not_found()),
        other => panic!("expected hard failure, got {:?}", other),
    }
    server.verify().await;
}

#[tokio::test]
async fn test_count_single_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/data/search/"))
        .and(body_partial_json(json!({"include_counts": true, "results_limit": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [],
            "cursor": "would-continue",
            "count": {"total": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let close = close_client(&server).await;
    assert!(close.email_exists("someone@example.com").await.unwrap());
    server.verify().await;
}
