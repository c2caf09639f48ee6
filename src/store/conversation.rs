//! Conversation history: an append-only message list plus session flags.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::KeyValueStore;
use crate::types::{ConnectionStatus, Message, Sender};

/// Owned copy of the conversation for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub busy: bool,
    pub last_error: Option<String>,
    pub status: ConnectionStatus,
}

/// Ordered message list persisted through a [`KeyValueStore`].
///
/// Messages are only ever appended. Every append is written back to the
/// backing store under `key`.
pub struct ConversationStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    greeting: String,
    messages: Vec<Message>,
    busy: bool,
    last_error: Option<String>,
    status: ConnectionStatus,
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("key", &self.key)
            .field("messages", &self.messages.len())
            .field("busy", &self.busy)
            .field("status", &self.status)
            .finish()
    }
}

impl ConversationStore {
    /// Create an empty store. Call [`load`](Self::load) before use.
    pub fn new(
        backend: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        greeting: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            key: key.into(),
            greeting: greeting.into(),
            messages: Vec::new(),
            busy: false,
            last_error: None,
            status: ConnectionStatus::Idle,
        }
    }

    /// Create and immediately load.
    pub fn open(
        backend: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        greeting: impl Into<String>,
    ) -> Self {
        let mut store = Self::new(backend, key, greeting);
        store.load();
        store
    }

    /// Read persisted history, seeding a single greeting when there is none.
    ///
    /// Unreadable or unparsable history is logged and treated as absent.
    pub fn load(&mut self) {
        let stored = match self.backend.load(&self.key) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(key = %self.key, %error, "failed to read chat history");
                None
            }
        };

        let restored = stored.and_then(|raw| match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) => Some(messages),
            Err(error) => {
                tracing::warn!(key = %self.key, %error, "error loading chat history");
                None
            }
        });

        match restored {
            Some(messages) if !messages.is_empty() => {
                tracing::debug!(key = %self.key, count = messages.len(), "restored chat history");
                self.messages = messages;
            }
            _ => {
                self.messages.clear();
                let greeting = self.greeting.clone();
                self.append(greeting, Sender::Assistant);
            }
        }
    }

    /// Append a new message, persist, and return it.
    pub fn append(&mut self, text: impl Into<String>, sender: Sender) -> Message {
        let message = Message::new(next_message_id(), text, sender);
        self.messages.push(message.clone());
        self.persist();
        message
    }

    /// Write the full list to the backing store.
    ///
    /// Failures are logged; the in-memory conversation stays authoritative.
    pub fn persist(&self) {
        let serialized = match serde_json::to_string(&self.messages) {
            Ok(s) => s,
            Err(error) => {
                tracing::error!(%error, "failed to serialize chat history");
                return;
            }
        };
        if let Err(error) = self.backend.save(&self.key, &serialized) {
            tracing::warn!(key = %self.key, %error, "failed to persist chat history");
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.last_error = error;
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            messages: self.messages.clone(),
            busy: self.busy,
            last_error: self.last_error.clone(),
            status: self.status,
        }
    }
}

/// Millisecond timestamp plus a random suffix, so rapid sends never collide.
fn next_message_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..6])
}
