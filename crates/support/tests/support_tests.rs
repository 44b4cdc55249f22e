use std::sync::Arc;
use std::time::Duration;

use fitpass_rust_auth::{Session, SessionStore, UserRecord};
use fitpass_rust_support::{ChatPoller, PollTarget, PollUpdate, SupportClient, SupportError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn signed_in_client(server: &MockServer, token: &str) -> SupportClient {
    let session = SessionStore::new();
    session.set(Session {
        access_token: token.to_string(),
        user: UserRecord {
            id: "u1".to_string(),
            name: "Member".to_string(),
            email: "member@example.com".to_string(),
            phone: None,
            role: None,
        },
    });
    SupportClient::new(&server.uri(), reqwest::Client::new(), session)
}

#[tokio::test]
async fn test_chat_thread_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tickets/chat/support"))
        .and(header("Authorization", "Bearer chat_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                { "_id": "m1", "sender": "user", "text": "My pass QR is blank" },
                { "_id": "m2", "sender": "admin", "text": "Looking into it", "read": false }
            ]
        })))
        .mount(&mock_server)
        .await;

    let support = signed_in_client(&mock_server, "chat_token");
    let thread = support.chat_thread().await.unwrap();

    assert_eq!(thread.messages.len(), 2);
    assert_eq!(thread.messages[1].text, "Looking into it");
}

#[tokio::test]
async fn test_send_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tickets/chat/message"))
        .and(body_partial_json(json!({ "text": "Thanks!" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "m3",
            "sender": "user",
            "text": "Thanks!"
        })))
        .mount(&mock_server)
        .await;

    let support = signed_in_client(&mock_server, "tok");
    let message = support.send_message("Thanks!").await.unwrap();
    assert_eq!(message.id, "m3");
}

#[tokio::test]
async fn test_unread_count_requires_session() {
    let mock_server = MockServer::start().await;
    let support = SupportClient::new(
        &mock_server.uri(),
        reqwest::Client::new(),
        SessionStore::new(),
    );

    let result = support.unread_count().await;
    assert!(matches!(result, Err(SupportError::MissingSession)));
}

#[tokio::test]
async fn test_poller_delivers_updates_and_stops() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tickets/user/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 3 })))
        .mount(&mock_server)
        .await;

    let support = Arc::new(signed_in_client(&mock_server, "tok"));
    let (poller, mut rx) =
        ChatPoller::spawn(support, PollTarget::UnreadCount, Duration::from_millis(10));

    // At least two cycles come through, one per completed request.
    let first = rx.recv().await.expect("first update");
    assert!(matches!(first, PollUpdate::Unread(3)));
    let second = rx.recv().await.expect("second update");
    assert!(matches!(second, PollUpdate::Unread(3)));

    poller.stop();
    // Channel drains and closes once the task is aborted.
    while rx.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_poller_keeps_going_after_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tickets/chat/support"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .mount(&mock_server)
        .await;

    let support = Arc::new(signed_in_client(&mock_server, "tok"));
    let (poller, mut rx) =
        ChatPoller::spawn(support, PollTarget::Thread, Duration::from_millis(10));

    let first = rx.recv().await.expect("first update");
    assert!(matches!(first, PollUpdate::Failed(SupportError::Api { status: 500, .. })));
    let second = rx.recv().await.expect("second update");
    assert!(matches!(second, PollUpdate::Failed(_)));

    poller.stop();
}
