//! Push strategy: POST, then wait for the correlated reply on the push channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{reply_text, ReplyStrategy, StrategyKind};
use crate::error::{RelayError, Result};
use crate::push::PushChannel;
use crate::transport::WebhookClient;
use crate::types::RequestId;

pub struct PushStrategy {
    client: WebhookClient,
    channel: Arc<PushChannel>,
    deadline: Duration,
}

impl PushStrategy {
    pub fn new(client: WebhookClient, channel: Arc<PushChannel>, deadline: Duration) -> Self {
        Self {
            client,
            channel,
            deadline,
        }
    }

    pub fn channel(&self) -> &Arc<PushChannel> {
        &self.channel
    }
}

#[async_trait]
impl ReplyStrategy for PushStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Push
    }

    async fn acquire(&self, message: &str, request_id: &RequestId) -> Result<String> {
        // Register first so a fast push cannot arrive before anyone is listening.
        let pending = self.channel.register(request_id.clone())?;

        let envelope = self.client.send(message, Some(request_id)).await?;
        if envelope.is_completed() || envelope.is_error() {
            return reply_text(envelope);
        }

        match tokio::time::timeout(self.deadline, pending.wait()).await {
            Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
            Ok(Ok(_)) => Ok(super::EMPTY_REPLY_TEXT.to_string()),
            Ok(Err(error)) => Err(error),
            Err(_) => {
                tracing::warn!(%request_id, "no push reply before deadline");
                Err(RelayError::Timeout(self.deadline.as_millis() as u64))
            }
        }
    }

    async fn shutdown(&self) -> Result<()> {
        self.channel.close().await
    }
}
