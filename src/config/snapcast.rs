use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::services::snapcast::ClientSelector;

/// Snapcast server connection and the client to mirror.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SnapcastConfig {
    /// Host name or address of the snapserver.
    #[serde(default = "default_host")]
    pub host: String,

    /// JSON-RPC control port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Client to track: its id, configured name or host name.
    #[serde(default)]
    pub client: String,

    /// Milliseconds to wait for a response before failing a request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for SnapcastConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl SnapcastConfig {
    /// `host:port` to connect to.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Selector for the tracked client.
    pub fn selector(&self) -> ClientSelector {
        ClientSelector::new(self.client.trim())
    }

    /// Per-request response timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    1705
}

fn default_request_timeout_ms() -> u64 {
    5_000
}
