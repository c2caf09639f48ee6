//! Reply acquisition strategies.
//!
//! Exactly one strategy is active per session. All of them take the user's
//! text plus a correlation id and resolve to the assistant's reply text.

pub mod direct;
pub mod poll;
#[cfg(feature = "push")]
pub mod push;

pub use direct::DirectStrategy;
pub use poll::PollingStrategy;
#[cfg(feature = "push")]
pub use push::PushStrategy;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::config::ChatConfig;
use crate::error::{RelayError, Result};
use crate::transport::WebhookClient;
use crate::types::{ReplyEnvelope, RequestId};

/// Reply used when the webhook completes without any text.
pub const EMPTY_REPLY_TEXT: &str = "Recebi sua mensagem, mas não pude processar uma resposta.";

/// Which reply acquisition strategy a session uses.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StrategyKind {
    /// The POST response carries the reply.
    #[default]
    Direct,
    /// POST, then poll a status endpoint until the reply is completed.
    Poll,
    /// POST, then wait for the reply on the push channel.
    Push,
}

/// Obtains the assistant's reply for one outbound message.
#[async_trait]
pub trait ReplyStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Send `message` and wait for its reply.
    async fn acquire(&self, message: &str, request_id: &RequestId) -> Result<String>;

    /// Release long-lived resources (e.g. the push connection).
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Build the strategy selected in `config`.
pub async fn build_strategy(config: &ChatConfig) -> Result<Arc<dyn ReplyStrategy>> {
    let client = WebhookClient::from_config(config);
    match config.strategy {
        StrategyKind::Direct => Ok(Arc::new(DirectStrategy::new(client))),
        StrategyKind::Poll => Ok(Arc::new(PollingStrategy::new(
            client,
            config.poll_interval,
            config.reply_deadline,
        ))),
        #[cfg(feature = "push")]
        StrategyKind::Push => {
            let channel = crate::push::PushChannel::from_config(config).await?;
            Ok(Arc::new(PushStrategy::new(
                client,
                Arc::new(channel),
                config.reply_deadline,
            )))
        }
        #[cfg(not(feature = "push"))]
        StrategyKind::Push => Err(RelayError::Configuration(
            "push strategy requires the `push` feature".into(),
        )),
    }
}

/// Turn a terminal envelope into reply text.
pub(crate) fn reply_text(envelope: ReplyEnvelope) -> Result<String> {
    if envelope.is_error() {
        return Err(RelayError::Remote(
            envelope
                .response
                .unwrap_or_else(|| "workflow failed without details".to_string()),
        ));
    }
    Ok(envelope
        .response
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| EMPTY_REPLY_TEXT.to_string()))
}
