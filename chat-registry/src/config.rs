//! Runtime configuration for a registry actor.

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::constants::{DEFAULT_ACTOR_NAME, DEFAULT_REPLY_TIMEOUT_MS, REPLY_TIMEOUT_ENV};

/// Settings applied when spawning an owner actor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    /// Name used in log lines emitted by the actor
    pub name: String,

    /// Upper bound on how long `call` waits for its reply slot
    #[serde(rename = "replyTimeoutMs", with = "duration_ms")]
    pub reply_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ACTOR_NAME.to_string(),
            reply_timeout: Duration::from_millis(DEFAULT_REPLY_TIMEOUT_MS),
        }
    }
}

impl RegistryConfig {
    /// Defaults, with the reply timeout overridden by `CHAT_REGISTRY_REPLY_TIMEOUT_MS`
    /// when it is set to a valid number.
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var(REPLY_TIMEOUT_ENV) {
            Ok(value) => match value.trim().parse::<u64>() {
                Ok(ms) => config.with_reply_timeout(Duration::from_millis(ms)),
                Err(e) => {
                    warn!("Ignoring {REPLY_TIMEOUT_ENV}={value:?}: {e}");
                    config
                }
            },
            Err(_) => config,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
