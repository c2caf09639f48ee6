mod common;

use std::time::Duration;

use relay_chat::chat::SendOutcome;
use relay_chat::error::RelayError;
use relay_chat::strategy::{PollingStrategy, ReplyStrategy, StrategyKind};
use relay_chat::transport::WebhookClient;
use relay_chat::types::{ConnectionStatus, RequestId};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{memory_session, test_config};

fn strategy(server: &MockServer, deadline: Duration) -> PollingStrategy {
    let client = WebhookClient::new(format!("{}/webhook", server.uri()), Duration::from_secs(2));
    PollingStrategy::new(client, Duration::from_millis(20), deadline)
}

async fn mount_pending_send(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .and(body_partial_json(json!({"action": "send", "requestId": "req-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn polls_until_completed() {
    let server = MockServer::start().await;
    mount_pending_send(&server).await;
    Mock::given(method("GET"))
        .and(path("/webhook"))
        .and(query_param("requestId", "req-1"))
        .and(query_param("action", "poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/webhook"))
        .and(query_param("requestId", "req-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "completed", "response": "Oi!"})),
        )
        .mount(&server)
        .await;

    let reply = strategy(&server, Duration::from_secs(2))
        .acquire("Olá", &RequestId::from("req-1"))
        .await
        .expect("poll should complete");

    assert_eq!(reply, "Oi!");
    let polls = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "GET")
        .count();
    assert_eq!(polls, 3);
}

#[tokio::test]
async fn immediate_completion_skips_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "completed", "response": "Já!"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let reply = strategy(&server, Duration::from_secs(1))
        .acquire("Olá", &RequestId::from("req-1"))
        .await
        .unwrap();
    assert_eq!(reply, "Já!");
}

#[tokio::test]
async fn non_json_and_failed_polls_are_retried_silently() {
    let server = MockServer::start().await;
    mount_pending_send(&server).await;
    Mock::given(method("GET"))
        .and(path("/webhook"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html>busy</html>"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/webhook"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "completed", "response": "Oi!"})),
        )
        .mount(&server)
        .await;

    let reply = strategy(&server, Duration::from_secs(2))
        .acquire("Olá", &RequestId::from("req-1"))
        .await
        .unwrap();
    assert_eq!(reply, "Oi!");
}

#[tokio::test]
async fn remote_error_status_stops_polling() {
    let server = MockServer::start().await;
    mount_pending_send(&server).await;
    Mock::given(method("GET"))
        .and(path("/webhook"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "error", "response": "node failed"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = strategy(&server, Duration::from_secs(2))
        .acquire("Olá", &RequestId::from("req-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Remote(msg) if msg == "node failed"));
}

#[tokio::test]
async fn deadline_without_completion_is_a_poll_deadline() {
    let server = MockServer::start().await;
    mount_pending_send(&server).await;
    Mock::given(method("GET"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
        .mount(&server)
        .await;

    let err = strategy(&server, Duration::from_millis(150))
        .acquire("Olá", &RequestId::from("req-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::PollDeadline(150)));
}

#[tokio::test]
async fn session_falls_back_and_clears_busy_when_polling_never_completes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .and(body_partial_json(json!({"action": "send", "message": "Olá"})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/webhook"))
        .and(query_param("action", "poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), StrategyKind::Poll);
    let (session, notifier) = memory_session(&config).await;

    let outcome = session.send("Olá").await.unwrap();

    let SendOutcome::Fallback { message, error } = outcome else {
        panic!("expected fallback, got {outcome:?}");
    };
    assert!(message.text.starts_with("(Simulação - Timeout)"));
    assert!(error.contains("polling"));
    assert_eq!(session.status(), ConnectionStatus::Error);
    assert!(!session.is_busy());
    assert_eq!(notifier.descriptions().len(), 1);

    let sends = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .collect::<Vec<_>>();
    let body: serde_json::Value = serde_json::from_slice(&sends[0].body).unwrap();
    assert!(body["requestId"].as_str().is_some_and(|id| !id.is_empty()));
}
