use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::bridge::{Backoff, CoordinatorSettings};

/// Coordinator timing and degradation policy.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BridgeConfig {
    /// Milliseconds a control call may wait for the server to confirm it.
    #[serde(default = "default_intent_timeout_ms")]
    pub intent_timeout_ms: u64,

    /// First reconnect delay in milliseconds.
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Reconnect delay cap in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Random spread applied to each reconnect delay, as a fraction (0.0-1.0).
    #[serde(default = "default_backoff_jitter")]
    pub backoff_jitter: f64,

    /// Report playback as stopped while the server is unreachable.
    #[serde(default = "default_degrade_on_disconnect")]
    pub degrade_on_disconnect: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            intent_timeout_ms: default_intent_timeout_ms(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            backoff_jitter: default_backoff_jitter(),
            degrade_on_disconnect: default_degrade_on_disconnect(),
        }
    }
}

impl BridgeConfig {
    /// Reconnect schedule.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.backoff_initial_ms),
            Duration::from_millis(self.backoff_max_ms),
            self.backoff_jitter,
        )
    }

    /// Coordinator settings for a server address.
    pub fn coordinator_settings(&self, address: String) -> CoordinatorSettings {
        CoordinatorSettings {
            address,
            intent_timeout: Duration::from_millis(self.intent_timeout_ms),
            backoff: self.backoff(),
            degrade_on_disconnect: self.degrade_on_disconnect,
        }
    }
}

fn default_intent_timeout_ms() -> u64 {
    3_000
}

fn default_backoff_initial_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_backoff_jitter() -> f64 {
    0.2
}

fn default_degrade_on_disconnect() -> bool {
    true
}
