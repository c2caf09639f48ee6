//! Webhook wire formats: outbound send payload, reply envelope, correlation ids.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Client-generated token correlating an outbound send with its async reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of the outbound POST.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendPayload {
    pub action: String,
    pub message: String,
    #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
}

impl SendPayload {
    pub fn send(message: impl Into<String>, request_id: Option<RequestId>) -> Self {
        Self {
            action: "send".to_string(),
            message: message.into(),
            request_id,
        }
    }
}

/// Progress reported by the webhook for a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReplyStatus {
    Pending,
    Completed,
    Error,
}

/// Reply body returned by both the send and the poll endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyEnvelope {
    #[serde(default)]
    pub status: Option<ReplyStatus>,
    #[serde(default)]
    pub response: Option<String>,
}

impl ReplyEnvelope {
    pub fn pending() -> Self {
        Self {
            status: Some(ReplyStatus::Pending),
            response: None,
        }
    }

    /// A reply is final once the server says so.
    pub fn is_completed(&self) -> bool {
        self.status == Some(ReplyStatus::Completed)
    }

    pub fn is_error(&self) -> bool {
        self.status == Some(ReplyStatus::Error)
    }
}
