//! Integration tests for optimistic add and remove

use super::*;
use bookwatch_client::BookwatchError;
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

/// Builds a client and waits for the first snapshot.
async fn loaded_client(server: &MockServer) -> BookwatchClient {
    let client = client_for(server);
    let poll = client.start_polling();
    wait_until(&client, |c| !c.is_loading()).await;
    poll.join().await;
    client
}

#[tokio::test]
async fn test_add_shows_pending_card_until_created() {
    let mock_server = setup_mock_server().await;
    mount_list(&mock_server, &["1"]).await;

    Mock::given(method("POST"))
        .and(path("/api/card"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("42")
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&mock_server)
        .await;

    let client = loaded_client(&mock_server).await;

    let add = client.add("https://x", "T", "D");
    tokio::pin!(add);

    // Drive the add until the request is in flight.
    let early = tokio::time::timeout(Duration::from_millis(30), &mut add).await;
    assert!(early.is_err());
    assert_eq!(ids(&client), vec![CardId::new("1"), CardId::pending()]);

    let id = add.await.expect("add failed");
    assert_eq!(id, CardId::new("42"));
    assert_eq!(ids(&client), vec![CardId::new("1"), CardId::new("42")]);
}

#[tokio::test]
async fn test_failed_add_is_rolled_back() {
    let mock_server = setup_mock_server().await;
    mount_list(&mock_server, &["1"]).await;

    Mock::given(method("POST"))
        .and(path("/api/card"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = loaded_client(&mock_server).await;

    let result = client.add("https://x", "T", "D").await;

    assert!(matches!(
        result,
        Err(BookwatchError::Server {
            status_code: 503,
            ..
        })
    ));
    assert_eq!(ids(&client), vec![CardId::new("1")]);
    assert_eq!(client.metrics().get_metrics().rollbacks, 1);
}

#[tokio::test]
async fn test_concurrent_adds_resolve_their_own_cards() {
    let mock_server = setup_mock_server().await;
    mount_list(&mock_server, &[]).await;

    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({"title": "slow"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("slow-id")
                .set_delay(Duration::from_millis(80)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({"title": "fast"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("fast-id"))
        .mount(&mock_server)
        .await;

    let client = loaded_client(&mock_server).await;

    let (slow, fast) = tokio::join!(
        client.add("https://slow", "slow", "d"),
        client.add("https://fast", "fast", "d"),
    );

    assert_eq!(slow.expect("slow add failed"), CardId::new("slow-id"));
    assert_eq!(fast.expect("fast add failed"), CardId::new("fast-id"));

    let cards = client.cards();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].title, "slow");
    assert_eq!(cards[0].id, CardId::new("slow-id"));
    assert_eq!(cards[1].title, "fast");
    assert_eq!(cards[1].id, CardId::new("fast-id"));
}

#[tokio::test]
async fn test_remove_deletes_and_rolls_back_on_failure() {
    let mock_server = setup_mock_server().await;
    mount_list(&mock_server, &["1", "2", "3"]).await;

    Mock::given(method("DELETE"))
        .and(path("/api/card/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/card/3"))
        .respond_with(ResponseTemplate::new(400).set_body_string("locked"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = loaded_client(&mock_server).await;

    tokio_test::assert_ok!(client.remove(&CardId::new("1")).await);
    assert_eq!(ids(&client), vec![CardId::new("2"), CardId::new("3")]);

    let result = client.remove(&CardId::new("3")).await;
    assert!(matches!(
        result,
        Err(BookwatchError::Server {
            status_code: 400,
            ..
        })
    ));
    assert_eq!(ids(&client), vec![CardId::new("2"), CardId::new("3")]);
}

#[tokio::test]
async fn test_remove_pending_card_never_reaches_server() {
    let mock_server = setup_mock_server().await;
    mount_list(&mock_server, &["1"]).await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = loaded_client(&mock_server).await;
    let before = client.store().revision();

    let result = client.remove(&CardId::pending()).await;

    assert!(matches!(result, Err(BookwatchError::PendingCard)));
    assert_eq!(client.store().revision(), before);
}

#[tokio::test]
async fn test_cancelled_add_leaves_no_pending_card() {
    let mock_server = setup_mock_server().await;
    mount_list(&mock_server, &["1"]).await;

    Mock::given(method("POST"))
        .and(path("/api/card"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(200)))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let poll = client.start_polling();
    wait_until(&client, |c| !c.is_loading()).await;

    let result =
        tokio::time::timeout(Duration::from_millis(50), client.add("https://x", "T", "D")).await;
    assert!(result.is_err());
    assert_eq!(client.store().pending_count(), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    poll.join().await;

    assert_eq!(client.store().pending_count(), 0);
    assert_eq!(ids(&client), vec![CardId::new("1")]);
}

#[tokio::test]
async fn test_cancelled_remove_is_restored_by_next_poll() {
    let mock_server = setup_mock_server().await;
    mount_list(&mock_server, &["1", "2"]).await;

    Mock::given(method("DELETE"))
        .and(path("/api/card/2"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let poll = client.start_polling();
    wait_until(&client, |c| !c.is_loading()).await;

    let id = CardId::new("2");
    let result = tokio::time::timeout(Duration::from_millis(30), client.remove(&id)).await;
    assert!(result.is_err());

    wait_until(&client, |c| c.store().resolved_count() == 2).await;
    poll.join().await;

    assert_eq!(ids(&client), vec![CardId::new("1"), CardId::new("2")]);
}

