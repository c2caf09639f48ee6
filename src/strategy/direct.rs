//! Direct strategy: the webhook answers the POST with the final reply.

use async_trait::async_trait;

use super::{reply_text, ReplyStrategy, StrategyKind};
use crate::error::Result;
use crate::transport::WebhookClient;
use crate::types::RequestId;

pub struct DirectStrategy {
    client: WebhookClient,
}

impl DirectStrategy {
    pub fn new(client: WebhookClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReplyStrategy for DirectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    async fn acquire(&self, message: &str, request_id: &RequestId) -> Result<String> {
        tracing::debug!(%request_id, "awaiting direct webhook reply");
        let envelope = self.client.send(message, None).await?;
        reply_text(envelope)
    }
}
