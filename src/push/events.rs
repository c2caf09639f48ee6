//! Push channel frames and connection status.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::RequestId;

/// JSON frames exchanged on the push channel, `{"event": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushFrame {
    /// Client → server: deliver the reply for this id on this connection.
    RegisterRequest {
        #[serde(rename = "requestId")]
        request_id: RequestId,
    },
    /// Server → client: the reply for a registered id.
    WebhookResponse {
        #[serde(rename = "requestId")]
        request_id: RequestId,
        response: String,
    },
}

impl PushFrame {
    pub fn register(request_id: RequestId) -> Self {
        Self::RegisterRequest { request_id }
    }

    /// Parse a server frame. Events this client does not handle yield `Ok(None)`.
    pub fn from_server_payload(payload: &str) -> Result<Option<Self>, serde_json::Error> {
        let value: Value = serde_json::from_str(payload)?;
        match value.get("event").and_then(Value::as_str) {
            Some("webhook_response") => serde_json::from_value(value).map(Some),
            _ => Ok(None),
        }
    }
}

/// Lifecycle of the push connection as observed by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    Connected,
    Disconnected,
    Reconnecting { attempt: u32 },
    /// Reconnect attempts exhausted; the channel is down for good.
    ReconnectFailed,
    Closed,
}

impl PushStatus {
    /// Whether a new registration can still be delivered.
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::ReconnectFailed | Self::Closed)
    }
}
