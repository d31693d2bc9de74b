use chrono::{TimeZone, Utc};
use crm_sync::sell::{SellClient, SellObject};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common;

#[tokio::test]
async fn test_recent_contacts_since_cut_off() {
    common::init();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/contacts"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"data": {"id": 9, "email": "new@example.com", "updated_at": "2024-05-02T08:00:00Z"}},
                {"data": {"id": 8, "email": "mid@example.com", "updated_at": "2024-05-01T08:00:00Z"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/contacts"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"data": {"id": 7, "email": "old@example.com", "updated_at": "2024-04-01T08:00:00Z"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sell = SellClient::with_config(
        common::api_root(&server, "v2"),
        "token",
        SellClient::default_config(),
    )
    .unwrap();

    let since = Utc.with_ymd_and_hms(2024, 4, 15, 0, 0, 0).unwrap();
    let contacts = sell
        .all_items(SellObject::Contacts, Some(since))
        .await
        .unwrap();

    let emails: Vec<&str> = contacts
        .iter()
        .map(|c| c["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, ["new@example.com", "mid@example.com"]);
    server.verify().await;
}
