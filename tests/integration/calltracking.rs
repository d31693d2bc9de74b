use crm_sync::CallTrackingClient;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common;

#[tokio::test]
async fn test_calls_across_pages_with_rate_limit() {
    common::init();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [{"id": 11}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // First attempt at page two is rate limited once.
    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/11/calls"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/11/calls"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "calls": [{"id": "call_3"}],
            "next_page": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/11/calls"))
        .and(query_param("per_page", "150"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "calls": [{"id": "call_1"}, {"id": "call_2"}],
            "next_page": format!("{}/api/v1/accounts/11/calls?page=2", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctm = CallTrackingClient::with_config(
        common::api_root(&server, "api/v1"),
        "dXNlcjpzZWNyZXQ=",
        common::fast_retry(),
    )
    .unwrap();

    let calls = ctm.calls(&[]).await.unwrap();
    let ids: Vec<&str> = calls.iter().map(|c| c["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["call_1", "call_2", "call_3"]);
    server.verify().await;
}
