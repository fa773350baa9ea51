//! Integration tests using WireMock
//!
//! These tests run the client against a mock card store and cover the full
//! request/response cycle: the HTTP contract, optimistic mutations with
//! rollback, and poll reconciliation.

mod cards;
mod mutations;
mod polling;

use std::time::Duration;

use bookwatch_client::resilience::RetryConfig;
use bookwatch_client::{BookwatchClient, CardId};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Starts a fresh mock card store.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Builds a client pointed at the mock server with a short poll period.
pub fn client_for(server: &MockServer) -> BookwatchClient {
    BookwatchClient::builder()
        .base_url(server.uri())
        .poll_interval(Duration::from_millis(20))
        .retry(
            RetryConfig::new()
                .max_retries(2)
                .initial_delay(Duration::from_millis(1))
                .jitter(false),
        )
        .build()
        .expect("Failed to build client")
}

/// JSON body of a list response with one card per id.
pub fn cards_body(ids: &[&str]) -> Value {
    Value::Array(
        ids.iter()
            .map(|id| {
                json!({
                    "uuid": id,
                    "url": format!("https://example.com/{}", id),
                    "title": format!("Card {}", id),
                    "description": format!("Description of card {}", id),
                })
            })
            .collect(),
    )
}

/// Mounts a list endpoint answering with the given ids.
pub async fn mount_list(server: &MockServer, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/api/cards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cards_body(ids)))
        .mount(server)
        .await;
}

/// Ids of the client's cards, in display order.
pub fn ids(client: &BookwatchClient) -> Vec<CardId> {
    client.cards().into_iter().map(|card| card.id).collect()
}

/// Waits until `condition` holds, failing the test after a second.
pub async fn wait_until<F>(client: &BookwatchClient, condition: F)
where
    F: Fn(&BookwatchClient) -> bool,
{
    let mut changes = client.subscribe();
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition(client) {
            changes.changed().await.expect("store dropped");
        }
    })
    .await
    .expect("condition not reached in time");
}
