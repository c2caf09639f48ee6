//! Poll strategy: POST, then query the status endpoint at a fixed interval.

use std::time::Duration;

use async_trait::async_trait;

use super::{reply_text, ReplyStrategy, StrategyKind};
use crate::error::{RelayError, Result};
use crate::transport::WebhookClient;
use crate::types::RequestId;

pub struct PollingStrategy {
    client: WebhookClient,
    interval: Duration,
    deadline: Duration,
}

impl PollingStrategy {
    pub fn new(client: WebhookClient, interval: Duration, deadline: Duration) -> Self {
        Self {
            client,
            interval,
            deadline,
        }
    }

    async fn poll_until_complete(&self, request_id: &RequestId) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            tokio::time::sleep(self.interval).await;
            attempt += 1;
            match self.client.poll(request_id).await {
                Ok(envelope) if envelope.is_completed() || envelope.is_error() => {
                    tracing::debug!(%request_id, attempt, "poll reached terminal status");
                    return reply_text(envelope);
                }
                Ok(_) => {
                    tracing::trace!(%request_id, attempt, "reply still pending");
                }
                Err(error) if error.is_transient() => {
                    tracing::debug!(%request_id, attempt, %error, "poll failed, retrying");
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[async_trait]
impl ReplyStrategy for PollingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Poll
    }

    async fn acquire(&self, message: &str, request_id: &RequestId) -> Result<String> {
        let envelope = self.client.send(message, Some(request_id)).await?;
        if envelope.is_completed() || envelope.is_error() {
            return reply_text(envelope);
        }

        match tokio::time::timeout(self.deadline, self.poll_until_complete(request_id)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(%request_id, deadline_ms = self.deadline.as_millis() as u64, "polling deadline exceeded");
                Err(RelayError::PollDeadline(self.deadline.as_millis() as u64))
            }
        }
    }
}
