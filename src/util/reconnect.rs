//! Fixed-delay reconnection policy for the push channel.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How many times, and how far apart, a dropped connection is re-established.
///
/// The delay is constant between attempts; there is no exponential growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Attempts after a disconnect before giving up. Zero disables reconnection.
    pub max_attempts: u32,
    /// Wait before each attempt.
    #[serde(with = "duration_ms", rename = "delay_ms")]
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(3),
        }
    }
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy that never reconnects.
    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before `attempt` (1-based), or `None` once attempts are exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        (attempt >= 1 && attempt <= self.max_attempts).then_some(self.delay)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_fixed_until_attempts_run_out() {
        let policy = ReconnectPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for(4), None);
        assert_eq!(policy.delay_for(0), None);
    }

    #[test]
    fn disabled_policy_never_retries() {
        assert_eq!(ReconnectPolicy::disabled().delay_for(1), None);
    }

    #[test]
    fn deserializes_delay_in_milliseconds() {
        let policy: ReconnectPolicy =
            toml::from_str("max_attempts = 2\ndelay_ms = 1500").unwrap();
        assert_eq!(policy, ReconnectPolicy::new(2, Duration::from_millis(1500)));
    }
}
