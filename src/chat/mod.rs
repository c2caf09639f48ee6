//! Chat session: the send/receive orchestration around one conversation.

pub mod fallback;
pub mod notify;

pub use fallback::fallback_for;
pub use notify::{Notification, Notifier, TracingNotifier};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::ChatConfig;
use crate::error::{RelayError, Result};
use crate::store::{ConversationSnapshot, ConversationStore, KeyValueStore};
use crate::strategy::{build_strategy, ReplyStrategy, StrategyKind};
use crate::types::{ConnectionStatus, Message, RequestId, Sender};
use crate::ui::validate_input;
use crate::util::timeout::with_timeout;

/// Per-session limits and delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub max_input_chars: usize,
    /// Outer bound on a whole reply acquisition.
    pub reply_timeout: Duration,
    pub fallback_delay: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            max_input_chars: config.max_input_chars,
            reply_timeout: config.request_timeout.saturating_add(config.reply_deadline),
            fallback_delay: config.fallback_delay,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

/// Result of [`ChatSession::send`].
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The backend replied; the assistant message was appended.
    Replied(Message),
    /// The backend failed; a fallback message was appended.
    Fallback { message: Message, error: String },
    /// Another send is still in flight; nothing happened.
    Busy,
}

impl SendOutcome {
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Replied(message) | Self::Fallback { message, .. } => Some(message),
            Self::Busy => None,
        }
    }
}

/// One conversation wired to a reply strategy.
///
/// At most one send is in flight; a concurrent `send` returns
/// [`SendOutcome::Busy`] without touching the network.
pub struct ChatSession {
    store: Mutex<ConversationStore>,
    strategy: Arc<dyn ReplyStrategy>,
    notifier: Arc<dyn Notifier>,
    settings: SessionSettings,
}

impl ChatSession {
    pub fn new(
        store: ConversationStore,
        strategy: Arc<dyn ReplyStrategy>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            strategy,
            notifier: Arc::new(TracingNotifier),
            settings,
        }
    }

    /// Load history from `backend` and build the configured strategy.
    pub async fn from_config(
        config: &ChatConfig,
        backend: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        config.validate()?;
        let store = ConversationStore::open(backend, config.storage_key.clone(), config.greeting.clone());
        let strategy = build_strategy(config).await?;
        Ok(Self::new(store, strategy, SessionSettings::from_config(config)))
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Send user text and wait for the reply (or a fallback).
    ///
    /// Invalid input is rejected before anything is appended or sent.
    pub async fn send(&self, raw: &str) -> Result<SendOutcome> {
        let text = validate_input(raw, self.settings.max_input_chars)?;

        {
            let mut store = self.lock()?;
            if store.is_busy() {
                tracing::debug!("send ignored: a reply is still pending");
                return Ok(SendOutcome::Busy);
            }
            store.append(text.clone(), Sender::User);
            store.set_busy(true);
            store.set_error(None);
            store.set_status(ConnectionStatus::Sending);
        }
        let _busy = BusyGuard { session: self };

        let request_id = RequestId::generate();
        tracing::info!(%request_id, strategy = %self.strategy.kind(), "sending message");

        let result = with_timeout(
            self.settings.reply_timeout,
            self.strategy.acquire(&text, &request_id),
        )
        .await;

        match result {
            Ok(reply) => {
                tracing::info!(%request_id, "reply received");
                let mut store = self.lock()?;
                let message = store.append(reply, Sender::Assistant);
                store.set_status(ConnectionStatus::Received);
                Ok(SendOutcome::Replied(message))
            }
            Err(error) => {
                tracing::warn!(%request_id, %error, "send failed, using fallback reply");
                self.resolve_failure(&text, error).await
            }
        }
    }

    async fn resolve_failure(&self, text: &str, error: RelayError) -> Result<SendOutcome> {
        let (notification, reply) = fallback_for(&error, text);
        self.notifier.notify(&notification);
        {
            let mut store = self.lock()?;
            store.set_error(Some(notification.description.clone()));
            store.set_status(ConnectionStatus::Error);
        }

        tokio::time::sleep(self.settings.fallback_delay).await;

        let message = self.lock()?.append(reply, Sender::Assistant);
        Ok(SendOutcome::Fallback {
            message,
            error: error.to_string(),
        })
    }

    pub fn snapshot(&self) -> Result<ConversationSnapshot> {
        Ok(self.lock()?.snapshot())
    }

    pub fn messages(&self) -> Result<Vec<Message>> {
        Ok(self.lock()?.messages().to_vec())
    }

    pub fn is_busy(&self) -> bool {
        self.lock().map(|s| s.is_busy()).unwrap_or(false)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock()
            .map(|s| s.status())
            .unwrap_or(ConnectionStatus::Error)
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().ok()?.last_error().map(str::to_string)
    }

    /// Tear down strategy resources (closes the push channel, if any).
    pub async fn shutdown(&self) -> Result<()> {
        self.strategy.shutdown().await
    }

    fn lock(&self) -> Result<MutexGuard<'_, ConversationStore>> {
        self.store
            .lock()
            .map_err(|_| RelayError::InvalidState("conversation lock poisoned".into()))
    }
}

/// Clears the busy flag however the send ends, including cancellation.
struct BusyGuard<'a> {
    session: &'a ChatSession,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut store) = self.session.store.lock() {
            store.set_busy(false);
        }
    }
}
