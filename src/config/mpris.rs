use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::services::mpris::EndpointSettings;

/// How the bridge presents itself on the session bus.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct MprisConfig {
    /// `Identity` shown by media controllers.
    #[serde(default = "default_identity")]
    pub identity: String,

    /// Desktop file basename, without `.desktop`.
    #[serde(default)]
    pub desktop_entry: String,

    /// Bus name suffix. Empty uses the tracked client selector.
    #[serde(default)]
    pub instance: String,
}

impl Default for MprisConfig {
    fn default() -> Self {
        Self {
            identity: default_identity(),
            desktop_entry: String::new(),
            instance: String::new(),
        }
    }
}

impl MprisConfig {
    /// Endpoint settings, falling back to `client` for the instance suffix.
    pub fn endpoint_settings(&self, client: &str) -> EndpointSettings {
        let instance = if self.instance.trim().is_empty() {
            client
        } else {
            self.instance.trim()
        };

        EndpointSettings {
            instance: instance.to_string(),
            identity: self.identity.clone(),
            desktop_entry: self.desktop_entry.clone(),
        }
    }
}

fn default_identity() -> String {
    "Snapcast".to_string()
}
