//! Shared HTTP client and the webhook send/poll calls.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Response;

use crate::config::ChatConfig;
use crate::error::{RelayError, Result};
use crate::types::{ReplyEnvelope, RequestId, SendPayload};

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .default_headers(json_headers())
            .pool_max_idle_per_host(4)
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "falling back to default HTTP client");
                reqwest::Client::new()
            })
    })
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Client for the webhook's send and poll endpoints.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    webhook_url: String,
    poll_url: String,
    request_timeout: Duration,
}

impl WebhookClient {
    pub fn new(webhook_url: impl Into<String>, request_timeout: Duration) -> Self {
        let webhook_url = webhook_url.into();
        Self {
            client: shared_client().clone(),
            poll_url: webhook_url.clone(),
            webhook_url,
            request_timeout,
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.webhook_url.clone(), config.request_timeout)
            .with_poll_url(config.poll_url())
    }

    pub fn with_poll_url(mut self, poll_url: impl Into<String>) -> Self {
        self.poll_url = poll_url.into();
        self
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// POST `{action: "send", message, requestId?}` to the webhook.
    ///
    /// An empty 2xx body means the reply is still pending.
    pub async fn send(
        &self,
        message: &str,
        request_id: Option<&RequestId>,
    ) -> Result<ReplyEnvelope> {
        let payload = SendPayload::send(message, request_id.cloned());
        tracing::debug!(url = %self.webhook_url, request_id = ?request_id, "posting message to webhook");

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let response = ensure_success(response).await?;
        let body = response.text().await.map_err(|e| self.map_request_error(e))?;
        if body.trim().is_empty() {
            return Ok(ReplyEnvelope::pending());
        }
        serde_json::from_str(&body).map_err(|error| {
            RelayError::MalformedResponse(format!("webhook reply is not valid JSON: {error}"))
        })
    }

    /// GET the status endpoint for `request_id`. The reply must be JSON.
    pub async fn poll(&self, request_id: &RequestId) -> Result<ReplyEnvelope> {
        let response = self
            .client
            .get(&self.poll_url)
            .query(&[("requestId", request_id.as_str()), ("action", "poll")])
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let response = ensure_success(response).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_json_content_type(&content_type) {
            return Err(RelayError::MalformedResponse(format!(
                "poll endpoint returned non-JSON content-type '{content_type}'"
            )));
        }

        let body = response.text().await.map_err(|e| self.map_request_error(e))?;
        serde_json::from_str(&body).map_err(|error| {
            RelayError::MalformedResponse(format!("poll reply is not valid JSON: {error}"))
        })
    }

    fn map_request_error(&self, error: reqwest::Error) -> RelayError {
        if error.is_timeout() {
            RelayError::Timeout(self.request_timeout.as_millis() as u64)
        } else {
            RelayError::Network(error)
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let reason = status.canonical_reason().unwrap_or("request failed").to_string();
    let body = response.text().await.unwrap_or_default();
    Err(status_to_error(status.as_u16(), &reason, &body))
}

/// Build an error for a non-2xx status, preferring a short server message.
pub fn status_to_error(status: u16, reason: &str, body: &str) -> RelayError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| reason.to_string());
    RelayError::http(status, detail)
}

fn is_json_content_type(value: &str) -> bool {
    value
        .split(';')
        .next()
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_content_type_detection() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(!is_json_content_type("text/html; charset=utf-8"));
        assert!(!is_json_content_type(""));
    }

    #[test]
    fn status_error_prefers_server_message() {
        let err = status_to_error(404, "Not Found", r#"{"code":404,"message":"webhook not registered"}"#);
        assert!(matches!(err, RelayError::Http { status: 404, message } if message == "webhook not registered"));

        let err = status_to_error(500, "Internal Server Error", "<html>");
        assert!(matches!(err, RelayError::Http { status: 500, message } if message == "Internal Server Error"));
    }
}
