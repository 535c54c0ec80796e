//! Configuration schema definitions and loading.
//!
//! One TOML file with four sections. Every field has a default except the
//! tracked client, which must come from the file or the command line.

mod bridge;
mod general;
mod loading;
mod mpris;
mod paths;
mod snapcast;

#[cfg(test)]
mod tests;

pub use bridge::BridgeConfig;
pub use general::{GeneralConfig, LogLevel};
pub use mpris::MprisConfig;
pub use paths::ConfigPaths;
pub use snapcast::SnapcastConfig;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct Config {
    /// Logging.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Snapcast server and tracked client.
    #[serde(default)]
    pub snapcast: SnapcastConfig,

    /// Coordinator timing.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Bus presentation.
    #[serde(default)]
    pub mpris: MprisConfig,
}

impl Config {
    /// JSON schema of the configuration file, pretty printed.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be serialized
    pub fn json_schema() -> serde_json::Result<String> {
        serde_json::to_string_pretty(&schemars::schema_for!(Config))
    }
}
