use std::{
    env,
    io::{Error, ErrorKind},
    path::PathBuf,
};

const APP_DIR: &str = "snapcast-mpris";

/// Locations of configuration and log files
///
/// Follows the XDG Base Directory specification
pub struct ConfigPaths;

impl ConfigPaths {
    /// Returns the configuration directory path
    ///
    /// - First checks `XDG_CONFIG_HOME`
    /// - Falls back to `$HOME/.config`
    ///
    /// # Errors
    /// Returns an error if neither `XDG_CONFIG_HOME` nor `HOME` environment variables are set
    pub fn config_dir() -> Result<PathBuf, Error> {
        let config_home = env::var("XDG_CONFIG_HOME")
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/.config")))
            .map_err(|_| {
                Error::new(
                    ErrorKind::NotFound,
                    "Neither XDG_CONFIG_HOME nor HOME environment variable found",
                )
            })?;

        Ok(PathBuf::from(config_home).join(APP_DIR))
    }

    /// Returns the path to the main configuration file
    ///
    /// # Errors
    /// Returns an error if the configuration directory cannot be determined
    pub fn main_config() -> Result<PathBuf, Error> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the log directory
    ///
    /// Uses `XDG_STATE_HOME`, falling back to `$HOME/.local/state`.
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    /// Returns error if no base directory is known or it cannot be created
    pub fn log_dir() -> Result<PathBuf, Error> {
        let state_home = env::var("XDG_STATE_HOME")
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/.local/state")))
            .map_err(|_| {
                Error::new(
                    ErrorKind::NotFound,
                    "Neither XDG_STATE_HOME nor HOME environment variable found",
                )
            })?;

        let log_dir = PathBuf::from(state_home).join(APP_DIR).join("logs");

        if !log_dir.exists() {
            std::fs::create_dir_all(&log_dir)?;
        }

        Ok(log_dir)
    }
}
