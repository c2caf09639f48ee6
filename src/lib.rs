//! relay-chat: terminal chat client for automation webhooks.
//!
//! Relays user text to a webhook and waits for the reply using one of three
//! strategies: the direct POST response, polling a status endpoint, or a
//! push channel correlated by request id. History is persisted through a
//! pluggable key-value store, and any failure resolves to a local fallback
//! reply so the conversation never stalls.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use relay_chat::prelude::*;
//!
//! # async fn example() -> relay_chat::error::Result<()> {
//! let config = ChatConfig::from_env();
//! let backend = Arc::new(FileKeyValueStore::new(config.history_dir()));
//! let session = ChatSession::from_config(&config, backend).await?;
//! if let SendOutcome::Replied(reply) = session.send("Olá").await? {
//!     println!("{}", reply.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod prelude;
pub mod store;
pub mod strategy;
pub mod transport;
pub mod types;
pub mod ui;
pub mod util;

#[cfg(feature = "push")]
pub mod push;

#[cfg(feature = "cli")]
pub mod cli;
