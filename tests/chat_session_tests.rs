mod common;

use std::sync::Arc;
use std::time::Duration;

use relay_chat::chat::SendOutcome;
use relay_chat::error::RelayError;
use relay_chat::strategy::{StrategyKind, EMPTY_REPLY_TEXT};
use relay_chat::types::{ConnectionStatus, Sender};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{memory_session, test_config};

#[tokio::test]
async fn direct_send_posts_message_and_appends_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .and(body_json(json!({"action": "send", "message": "Olá"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "completed", "response": "Oi!"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), StrategyKind::Direct);
    let (session, notifier) = memory_session(&config).await;

    let outcome = session.send("Olá").await.expect("send should resolve");

    let messages = session.messages().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].sender, Sender::User);
    assert_eq!(messages[1].text, "Olá");
    assert_eq!(messages[2].sender, Sender::Assistant);
    assert_eq!(messages[2].text, "Oi!");
    assert!(matches!(outcome, SendOutcome::Replied(ref m) if m.text == "Oi!"));
    assert_eq!(session.status(), ConnectionStatus::Received);
    assert!(!session.is_busy());
    assert!(notifier.descriptions().is_empty());
}

#[tokio::test]
async fn reply_without_response_field_uses_default_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), StrategyKind::Direct);
    let (session, _) = memory_session(&config).await;

    let outcome = session.send("Olá").await.unwrap();
    assert_eq!(outcome.message().unwrap().text, EMPTY_REPLY_TEXT);
}

#[tokio::test]
async fn server_error_resolves_to_connection_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), StrategyKind::Direct);
    let (session, notifier) = memory_session(&config).await;

    let outcome = session.send("Olá").await.unwrap();

    let SendOutcome::Fallback { message, error } = outcome else {
        panic!("expected fallback, got {outcome:?}");
    };
    assert!(message.text.starts_with("(Simulação - Erro de Conexão)"));
    assert!(message.text.contains("\"Olá\""));
    assert!(error.contains("500"));
    assert_eq!(session.status(), ConnectionStatus::Error);
    assert!(session.last_error().is_some());
    assert_eq!(notifier.descriptions().len(), 1);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn slow_server_hits_request_timeout_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "completed", "response": "late"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri(), StrategyKind::Direct);
    config.request_timeout = Duration::from_millis(200);
    let (session, _) = memory_session(&config).await;

    let outcome = session.send("Olá").await.unwrap();

    let message = outcome.message().unwrap();
    assert!(message.text.starts_with("(Simulação - Timeout)"), "{}", message.text);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn non_json_reply_resolves_to_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html>Workflow was started</html>"),
        )
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), StrategyKind::Direct);
    let (session, _) = memory_session(&config).await;

    let outcome = session.send("Olá").await.unwrap();
    assert!(outcome
        .message()
        .unwrap()
        .text
        .starts_with("(Simulação - Resposta Inválida)"));
}

#[tokio::test]
async fn second_send_while_busy_is_a_no_op() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "completed", "response": "Oi!"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), StrategyKind::Direct);
    let (session, _) = memory_session(&config).await;
    let session = Arc::new(session);

    let first = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.send("primeira").await }
    });

    tokio::time::timeout(Duration::from_secs(1), async {
        while !session.is_busy() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("first send should mark the session busy");

    // The user message is already there while the request is in flight.
    let in_flight = session.messages().unwrap();
    assert_eq!(in_flight.len(), 2);
    assert_eq!(in_flight[1].text, "primeira");
    assert_eq!(session.status(), ConnectionStatus::Sending);

    let second = session.send("segunda").await.unwrap();
    assert_eq!(second, SendOutcome::Busy);
    assert_eq!(session.messages().unwrap().len(), 2);

    let first = first.await.unwrap().unwrap();
    assert!(matches!(first, SendOutcome::Replied(_)));
    assert_eq!(session.messages().unwrap().len(), 3);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn over_long_input_is_rejected_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), StrategyKind::Direct);
    let (session, _) = memory_session(&config).await;

    let err = session.send(&"a".repeat(1001)).await.unwrap_err();

    assert!(matches!(err, RelayError::InvalidInput(_)));
    assert_eq!(session.messages().unwrap().len(), 1);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn unreachable_webhook_still_resolves() {
    // Nothing listens on port 9 of the loopback interface.
    let config = test_config("http://127.0.0.1:9", StrategyKind::Direct);
    let (session, notifier) = memory_session(&config).await;

    let outcome = session.send("Olá").await.unwrap();

    assert!(matches!(outcome, SendOutcome::Fallback { .. }));
    assert_eq!(notifier.descriptions().len(), 1);
    assert_eq!(session.messages().unwrap().len(), 3);
}
