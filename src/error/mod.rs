//! Error types for relay-chat.

use thiserror::Error;

/// Primary error type for all relay-chat operations.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP error (status {status}): {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("No completed reply after {0}ms of polling")]
    PollDeadline(u64),

    #[error("Push channel disconnected: {0}")]
    PushDisconnected(String),

    #[error("Remote workflow reported an error: {0}")]
    Remote(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Failure classes surfaced to the user at the send boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request (or the whole reply wait) ran out of time.
    Timeout,
    /// Connection could not be established or the server answered non-2xx.
    Connection,
    /// The server answered, but not with something we could read.
    MalformedResponse,
    /// The push channel dropped and could not be restored.
    PushDisconnected,
    /// The remote workflow itself reported a failure.
    Remote,
    /// Local problem (input, storage, configuration).
    Local,
}

impl RelayError {
    /// Create an HTTP status error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Classify this error for notification and fallback text.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout(_) | Self::PollDeadline(_) => FailureKind::Timeout,
            Self::Network(err) if err.is_timeout() => FailureKind::Timeout,
            Self::Network(err) if err.is_decode() => FailureKind::MalformedResponse,
            Self::Network(_) | Self::Http { .. } => FailureKind::Connection,
            Self::MalformedResponse(_) | Self::Serialization(_) => FailureKind::MalformedResponse,
            Self::PushDisconnected(_) => FailureKind::PushDisconnected,
            Self::Remote(_) => FailureKind::Remote,
            Self::Configuration(_)
            | Self::Io(_)
            | Self::InvalidInput(_)
            | Self::Storage(_)
            | Self::InvalidState(_) => FailureKind::Local,
        }
    }

    /// Whether a poll loop should keep going after this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::Connection | FailureKind::MalformedResponse | FailureKind::Timeout
        ) && !matches!(self, Self::PollDeadline(_))
    }
}

impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(format!("Invalid config file: {err}"))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, RelayError>;
