use std::{fs, path::Path};

use tracing::{debug, info};

use super::{Config, ConfigPaths};
use crate::{AppError, Result};

impl Config {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used and a missing file means defaults.
    ///
    /// # Arguments
    /// * `path` - Explicit configuration file, if any
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Self::load_file(path),
            None => {
                let path = ConfigPaths::main_config()?;
                if path.exists() {
                    Self::load_file(&path)
                } else {
                    debug!(path = %path.display(), "No configuration file; using defaults");
                    Ok(Config::default())
                }
            }
        }
    }

    /// Read and parse one TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| AppError::IoError {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        let config = toml::from_str(&content).map_err(|e| AppError::toml_parse(e, Some(path)))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the content is not valid TOML for this schema
    pub fn from_toml_str(content: &str) -> Result<Config> {
        toml::from_str(content).map_err(|e| AppError::toml_parse(e, None))
    }

    /// Check values that deserialize fine but cannot work.
    ///
    /// # Errors
    /// Returns `AppError::InvalidConfigField` for the first offending field
    pub fn validate(&self) -> Result<()> {
        if self.snapcast.client.trim().is_empty() {
            return Err(invalid("client", "snapcast", "no client selector configured"));
        }
        if self.snapcast.host.trim().is_empty() {
            return Err(invalid("host", "snapcast", "must not be empty"));
        }
        if self.snapcast.port == 0 {
            return Err(invalid("port", "snapcast", "must be between 1 and 65535"));
        }
        if self.snapcast.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms", "snapcast", "must be positive"));
        }
        if self.bridge.intent_timeout_ms == 0 {
            return Err(invalid("intent_timeout_ms", "bridge", "must be positive"));
        }
        if self.bridge.backoff_initial_ms == 0 || self.bridge.backoff_max_ms == 0 {
            return Err(invalid("backoff_initial_ms", "bridge", "delays must be positive"));
        }
        if self.bridge.backoff_initial_ms > self.bridge.backoff_max_ms {
            return Err(invalid(
                "backoff_initial_ms",
                "bridge",
                "must not exceed backoff_max_ms",
            ));
        }
        if !(0.0..=1.0).contains(&self.bridge.backoff_jitter) {
            return Err(invalid("backoff_jitter", "bridge", "must be within 0.0-1.0"));
        }
        if self.mpris.identity.trim().is_empty() {
            return Err(invalid("identity", "mpris", "must not be empty"));
        }

        Ok(())
    }
}

fn invalid(field: &str, component: &str, reason: &str) -> AppError {
    AppError::InvalidConfigField {
        field: field.to_string(),
        component: component.to_string(),
        reason: reason.to_string(),
    }
}
