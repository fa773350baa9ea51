//! Integration tests for poll reconciliation

use super::*;
use bookwatch_client::CardDraft;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_first_poll_replaces_placeholders() {
    let mock_server = setup_mock_server().await;
    mount_list(&mock_server, &["1", "2"]).await;

    let client = client_for(&mock_server);
    assert!(client.is_loading());
    assert_eq!(client.cards().len(), 3);

    let poll = client.start_polling();
    wait_until(&client, |c| !c.is_loading()).await;
    poll.join().await;

    assert_eq!(ids(&client), vec![CardId::new("1"), CardId::new("2")]);
}

#[tokio::test]
async fn test_failed_first_poll_keeps_loading() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/cards"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let poll = client.start_polling();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let stats = poll.stats();
    poll.join().await;

    assert!(stats.failures >= 1);
    assert_eq!(stats.applied, 0);
    assert!(client.is_loading());
}

#[tokio::test]
async fn test_shrinking_snapshot_keeps_pending_cards() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/cards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cards_body(&["1", "2"])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_list(&mock_server, &["1"]).await;

    let client = client_for(&mock_server);
    let poll = client.start_polling();
    wait_until(&client, |c| !c.is_loading()).await;

    client
        .store()
        .append_pending(CardDraft::new("https://pending", "P", "D"));

    wait_until(&client, |c| c.store().resolved_count() == 1).await;
    poll.join().await;

    assert_eq!(ids(&client), vec![CardId::new("1"), CardId::pending()]);
}

#[tokio::test]
async fn test_stop_discards_in_flight_fetch() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/cards"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cards_body(&["1"]))
                .set_delay(Duration::from_millis(150)),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let before = client.store().revision();

    let poll = client.start_polling();
    tokio::time::sleep(Duration::from_millis(40)).await;
    poll.stop();
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert!(client.is_loading());
    assert_eq!(client.store().revision(), before);
    assert_eq!(poll.stats().applied, 0);
    poll.join().await;
}
