//! Convenience re-exports.

pub use crate::chat::{ChatSession, Notification, Notifier, SendOutcome, SessionSettings};
pub use crate::config::ChatConfig;
pub use crate::error::{FailureKind, RelayError, Result};
pub use crate::store::{
    ConversationSnapshot, ConversationStore, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore,
};
pub use crate::strategy::{ReplyStrategy, StrategyKind};
pub use crate::types::{ConnectionStatus, Message, ReplyEnvelope, ReplyStatus, RequestId, Sender};
pub use crate::util::reconnect::ReconnectPolicy;

#[cfg(feature = "push")]
pub use crate::push::{PushChannel, PushStatus};
