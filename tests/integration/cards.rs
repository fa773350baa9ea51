//! Integration tests for the card store HTTP contract

use super::*;
use bookwatch_client::{BookwatchError, CardDraft};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_list_integration_success() {
    let mock_server = setup_mock_server().await;
    mount_list(&mock_server, &["1", "2"]).await;

    let client = client_for(&mock_server);
    let cards = tokio_test::assert_ok!(client.service().list().await);

    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].id, CardId::new("1"));
    assert_eq!(cards[1].title, "Card 2");
}

#[tokio::test]
async fn test_list_integration_malformed_body() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/cards"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.service().list().await;

    assert!(matches!(result, Err(BookwatchError::Serialization { .. })));
}

#[tokio::test]
async fn test_create_integration_sends_sentinel_uuid() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/api/card"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "uuid": "",
            "url": "https://docs.rs",
            "title": "Docs",
            "description": "Crate docs",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("42"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let id = client
        .service()
        .create(&CardDraft::new("https://docs.rs", "Docs", "Crate docs"))
        .await
        .expect("create failed");

    assert_eq!(id, CardId::new("42"));
}

#[tokio::test]
async fn test_create_integration_server_error() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/api/card"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client
        .service()
        .create(&CardDraft::new("https://docs.rs", "Docs", "Crate docs"))
        .await;

    match result {
        Err(BookwatchError::Server {
            status_code,
            message,
        }) => {
            assert_eq!(status_code, 500);
            assert_eq!(message, "database down");
        }
        other => panic!("expected server error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_integration_retries_transient_failure() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("DELETE"))
        .and(path("/api/card/7"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/card/7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    tokio_test::assert_ok!(client.service().delete(&CardId::new("7")).await);
}

#[tokio::test]
async fn test_delete_integration_missing_card_is_success() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("DELETE"))
        .and(path("/api/card/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    tokio_test::assert_ok!(client.service().delete(&CardId::new("gone")).await);
}

#[test_case("", "Title", "Description", "url" ; "missing url")]
#[test_case("https://a", "", "Description", "title" ; "missing title")]
#[test_case("https://a", "Title", "   ", "description" ; "blank description")]
#[tokio::test]
async fn test_add_rejects_missing_field(url: &str, title: &str, description: &str, field: &str) {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let before = client.store().revision();

    let result = client.add(url, title, description).await;

    match result {
        Err(BookwatchError::Validation { field: got, .. }) => {
            assert_eq!(got.as_deref(), Some(field));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(client.store().revision(), before);
}
