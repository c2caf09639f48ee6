//! Shared test helpers.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_chat::chat::{ChatSession, Notification, Notifier};
use relay_chat::config::ChatConfig;
use relay_chat::store::MemoryKeyValueStore;
use relay_chat::strategy::StrategyKind;

/// Config pointed at a mock server with short timings.
pub fn test_config(server_uri: &str, strategy: StrategyKind) -> ChatConfig {
    ChatConfig::builder()
        .webhook_url(format!("{server_uri}/webhook"))
        .strategy(strategy)
        .request_timeout(Duration::from_secs(2))
        .poll_interval(Duration::from_millis(20))
        .reply_deadline(Duration::from_millis(400))
        .fallback_delay(Duration::from_millis(10))
        .build()
}

/// Notifier that records everything it is given.
#[derive(Default)]
pub struct RecordingNotifier {
    pub seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn descriptions(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.description.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.seen.lock().unwrap().push(notification.clone());
    }
}

/// Session over an in-memory history with a recording notifier.
pub async fn memory_session(config: &ChatConfig) -> (ChatSession, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let session = ChatSession::from_config(config, Arc::new(MemoryKeyValueStore::new()))
        .await
        .expect("session should build")
        .with_notifier(notifier.clone());
    (session, notifier)
}
