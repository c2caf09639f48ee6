//! CLI entry point for relay-chat.

pub mod repl;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ChatConfig;
use crate::strategy::StrategyKind;

/// Chat with an automation webhook from the terminal
#[derive(Parser, Debug)]
#[command(name = "relay-chat", version, about = "Terminal chat client for automation webhooks")]
pub struct Cli {
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level CLI commands. Without one, `chat` runs.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat session
    Chat,
    /// Send one message and print the reply
    Send(SendArgs),
    /// Print the stored conversation
    History,
}

/// Arguments for `relay-chat send`.
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Message text
    pub message: String,
}

/// Flags that override the config file and environment.
#[derive(Args, Debug, Default)]
pub struct ConfigOverrides {
    /// Path to config.toml (default: ~/.relay-chat/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Reply strategy: direct, poll, or push
    #[arg(short, long, global = true)]
    pub strategy: Option<StrategyKind>,

    /// Webhook URL receiving messages
    #[arg(long, global = true)]
    pub webhook_url: Option<String>,

    /// Status endpoint for the poll strategy
    #[arg(long, global = true)]
    pub poll_url: Option<String>,

    /// WebSocket endpoint for the push strategy
    #[arg(long, global = true)]
    pub push_url: Option<String>,

    /// Directory holding the conversation history
    #[arg(long, global = true)]
    pub history_dir: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl ConfigOverrides {
    /// Apply flags on top of an already layered config.
    pub fn apply(&self, config: &mut ChatConfig) {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(url) = &self.webhook_url {
            config.webhook_url = url.clone();
        }
        if let Some(url) = &self.poll_url {
            config.poll_url = Some(url.clone());
        }
        if let Some(url) = &self.push_url {
            config.push_url = url.clone();
        }
        if let Some(dir) = &self.history_dir {
            config.history_dir = Some(dir.clone());
        }
        if let Some(secs) = self.timeout {
            config.request_timeout = std::time::Duration::from_secs(secs);
        }
    }
}
