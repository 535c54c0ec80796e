//! Command-line interface.
//!
//! Flags override values read from the configuration file.

pub mod formatting;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, LogLevel};

/// Expose a Snapcast client as an MPRIS media player
#[derive(Parser, Debug, Default)]
#[command(name = "snapcast-mpris", version)]
#[command(about = "Expose a Snapcast client as an MPRIS media player")]
pub struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/snapcast-mpris/config.toml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Snapserver host
    #[arg(long)]
    pub host: Option<String>,

    /// Snapserver control port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Client to track: id, name or host name
    #[arg(short = 'C', long)]
    pub client: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    pub print_config_schema: bool,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.snapcast.host = host.clone();
        }
        if let Some(port) = self.port {
            config.snapcast.port = port;
        }
        if let Some(client) = &self.client {
            config.snapcast.client = client.clone();
        }
        if let Some(level) = self.log_level {
            config.general.log_level = level;
        }
    }
}
