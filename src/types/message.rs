//! Chat message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Who authored a message.
///
/// The assistant is stored as `"ia"` so history written by the web widget
/// loads unchanged; `"assistant"` is accepted on read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Sender {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ia", alias = "assistant")]
    #[strum(to_string = "assistant", serialize = "ia")]
    Assistant,
}

/// A single entry in the conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(id: impl Into<String>, text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Coarse status shown next to the input.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Sending,
    Received,
    Error,
}
