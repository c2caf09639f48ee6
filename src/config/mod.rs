//! Configuration system (layered: defaults < config file < env < explicit overrides).

use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use serde::Deserialize;

use crate::error::{RelayError, Result};
use crate::strategy::StrategyKind;
use crate::util::reconnect::ReconnectPolicy;

pub const DEFAULT_WEBHOOK_URL: &str =
    "https://n8n.parceriacomia.com.br/webhook-test/receber-mensagem";
pub const DEFAULT_PUSH_URL: &str = "wss://n8n.parceriacomia.com.br/ws";
pub const DEFAULT_STORAGE_KEY: &str = "parceriaIA_chatHistory";
pub const DEFAULT_GREETING: &str =
    "Olá! Sou sua interface de comunicação com a IA. Como posso ajudar hoje?";
pub const DEFAULT_MAX_INPUT_CHARS: usize = 1000;
/// Upper bound for `request_timeout` and `reply_deadline`.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

const ENV_WEBHOOK_URL: &str = "RELAY_CHAT_WEBHOOK_URL";
const ENV_POLL_URL: &str = "RELAY_CHAT_POLL_URL";
const ENV_PUSH_URL: &str = "RELAY_CHAT_PUSH_URL";
const ENV_STRATEGY: &str = "RELAY_CHAT_STRATEGY";
const ENV_HISTORY_DIR: &str = "RELAY_CHAT_HISTORY_DIR";
const ENV_REQUEST_TIMEOUT_SECS: &str = "RELAY_CHAT_REQUEST_TIMEOUT_SECS";

/// Settings for one chat session.
#[derive(Debug, Clone, Builder)]
pub struct ChatConfig {
    /// Endpoint receiving `{action: "send", ...}` POSTs.
    #[builder(into, default = DEFAULT_WEBHOOK_URL.to_string())]
    pub webhook_url: String,
    /// Status endpoint for the poll strategy. Defaults to `webhook_url`.
    #[builder(into)]
    pub poll_url: Option<String>,
    /// WebSocket endpoint for the push strategy.
    #[builder(into, default = DEFAULT_PUSH_URL.to_string())]
    pub push_url: String,
    #[builder(default)]
    pub strategy: StrategyKind,
    /// Key under which the message list is persisted.
    #[builder(into, default = DEFAULT_STORAGE_KEY.to_string())]
    pub storage_key: String,
    /// Directory of the file-backed history store. Defaults to `~/.relay-chat`.
    pub history_dir: Option<PathBuf>,
    /// Upper bound on a single outbound request.
    #[builder(default = Duration::from_secs(60))]
    pub request_timeout: Duration,
    #[builder(default = Duration::from_secs(2))]
    pub poll_interval: Duration,
    /// Overall wait for an asynchronous (poll or push) reply.
    #[builder(default = Duration::from_secs(120))]
    pub reply_deadline: Duration,
    /// Pause before a fallback reply is appended after a failure.
    #[builder(default = Duration::from_millis(1500))]
    pub fallback_delay: Duration,
    #[builder(default = DEFAULT_MAX_INPUT_CHARS)]
    pub max_input_chars: usize,
    #[builder(into, default = DEFAULT_GREETING.to_string())]
    pub greeting: String,
    #[builder(default)]
    pub reconnect: ReconnectPolicy,
    #[builder(default = Duration::from_secs(25))]
    pub heartbeat_interval: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// On-disk shape of `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfigFile {
    pub webhook_url: Option<String>,
    pub poll_url: Option<String>,
    pub push_url: Option<String>,
    pub strategy: Option<StrategyKind>,
    pub storage_key: Option<String>,
    pub history_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub reply_deadline_secs: Option<u64>,
    pub fallback_delay_ms: Option<u64>,
    pub max_input_chars: Option<usize>,
    pub greeting: Option<String>,
    pub heartbeat_interval_secs: Option<u64>,
    pub reconnect: Option<ReconnectPolicy>,
}

impl ChatConfig {
    /// Defaults overlaid with environment variables (and `.env`, if present).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();
        if let Err(error) = config.apply_env(|key| std::env::var(key).ok()) {
            tracing::warn!(%error, "ignoring invalid environment configuration");
        }
        config
    }

    /// Full layering: defaults, then the config file, then the environment.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        let file = match path {
            Some(path) => Some(ChatConfigFile::read(path)?),
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Some(ChatConfigFile::read(&default_path)?)
                } else {
                    None
                }
            }
        };
        if let Some(file) = file {
            config.apply_file(file);
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from a parsed config file.
    pub fn apply_file(&mut self, file: ChatConfigFile) {
        if let Some(v) = file.webhook_url {
            self.webhook_url = v;
        }
        if let Some(v) = file.poll_url {
            self.poll_url = Some(v);
        }
        if let Some(v) = file.push_url {
            self.push_url = v;
        }
        if let Some(v) = file.strategy {
            self.strategy = v;
        }
        if let Some(v) = file.storage_key {
            self.storage_key = v;
        }
        if let Some(v) = file.history_dir {
            self.history_dir = Some(v);
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.poll_interval_ms {
            self.poll_interval = Duration::from_millis(v);
        }
        if let Some(v) = file.reply_deadline_secs {
            self.reply_deadline = Duration::from_secs(v);
        }
        if let Some(v) = file.fallback_delay_ms {
            self.fallback_delay = Duration::from_millis(v);
        }
        if let Some(v) = file.max_input_chars {
            self.max_input_chars = v;
        }
        if let Some(v) = file.greeting {
            self.greeting = v;
        }
        if let Some(v) = file.heartbeat_interval_secs {
            self.heartbeat_interval = Duration::from_secs(v);
        }
        if let Some(v) = file.reconnect {
            self.reconnect = v;
        }
    }

    /// Overlay values from environment-style lookups.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup(ENV_WEBHOOK_URL) {
            self.webhook_url = v;
        }
        if let Some(v) = lookup(ENV_POLL_URL) {
            self.poll_url = Some(v);
        }
        if let Some(v) = lookup(ENV_PUSH_URL) {
            self.push_url = v;
        }
        if let Some(v) = lookup(ENV_STRATEGY) {
            self.strategy = v.trim().parse().map_err(|_| {
                RelayError::Configuration(format!(
                    "{ENV_STRATEGY} must be one of direct, poll, push (got '{v}')"
                ))
            })?;
        }
        if let Some(v) = lookup(ENV_HISTORY_DIR) {
            self.history_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            let secs: u64 = v.trim().parse().map_err(|_| {
                RelayError::Configuration(format!(
                    "{ENV_REQUEST_TIMEOUT_SECS} must be a whole number of seconds (got '{v}')"
                ))
            })?;
            self.request_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    /// Reject settings that would make the session unusable.
    pub fn validate(&self) -> Result<()> {
        if self.webhook_url.trim().is_empty() {
            return Err(RelayError::Configuration("Webhook URL cannot be empty".into()));
        }
        if self.storage_key.trim().is_empty() {
            return Err(RelayError::Configuration("Storage key cannot be empty".into()));
        }
        if self.max_input_chars == 0 {
            return Err(RelayError::Configuration(
                "max_input_chars must be greater than zero".into(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(RelayError::Configuration(
                "poll_interval must be greater than zero".into(),
            ));
        }
        if self.request_timeout.is_zero() || self.reply_deadline.is_zero() {
            return Err(RelayError::Configuration("Timeouts must be greater than zero".into()));
        }
        if self.request_timeout > MAX_TIMEOUT || self.reply_deadline > MAX_TIMEOUT {
            return Err(RelayError::Configuration(format!(
                "Timeouts cannot exceed {} seconds",
                MAX_TIMEOUT.as_secs()
            )));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(RelayError::Configuration(
                "heartbeat_interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Effective status endpoint.
    pub fn poll_url(&self) -> &str {
        self.poll_url.as_deref().unwrap_or(&self.webhook_url)
    }

    /// Effective history directory.
    pub fn history_dir(&self) -> PathBuf {
        self.history_dir.clone().unwrap_or_else(default_relay_dir)
    }
}

impl ChatConfigFile {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            RelayError::Configuration(format!("Cannot read {}: {err}", path.display()))
        })?;
        Ok(toml::from_str(&raw)?)
    }
}

/// `~/.relay-chat`, or `.relay-chat` when no home directory is known.
pub fn default_relay_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".relay-chat"))
        .unwrap_or_else(|| PathBuf::from(".relay-chat"))
}

/// Default location of `config.toml`.
pub fn default_config_path() -> PathBuf {
    default_relay_dir().join("config.toml")
}
