//! Unit tests for CLI module
//!
//! Tests flag parsing and how flags overlay the configuration.

#![cfg_attr(test, allow(clippy::unwrap_used))]

use clap::Parser;

use crate::{
    cli::{Cli, formatting::format_error},
    config::{Config, LogLevel},
};

#[test]
fn flags_override_config() {
    let cli = Cli::try_parse_from([
        "snapcast-mpris",
        "--host",
        "music.local",
        "--port",
        "1780",
        "--client",
        "Kitchen",
        "--log-level",
        "debug",
    ])
    .unwrap();
    let mut config = Config::default();

    cli.apply(&mut config);

    assert_eq!(config.snapcast.address(), "music.local:1780");
    assert_eq!(config.snapcast.client, "Kitchen");
    assert_eq!(config.general.log_level, LogLevel::Debug);
}

#[test]
fn absent_flags_keep_file_values() {
    let cli = Cli::try_parse_from(["snapcast-mpris"]).unwrap();
    let mut config = Config::default();
    config.snapcast.client = "Office".into();

    cli.apply(&mut config);

    assert_eq!(config.snapcast.client, "Office");
    assert_eq!(config.snapcast.port, 1705);
}

#[test]
fn invalid_log_level_is_a_usage_error() {
    assert!(Cli::try_parse_from(["snapcast-mpris", "--log-level", "loud"]).is_err());
}

#[test]
fn format_error_wraps_in_ansi() {
    let formatted = format_error("boom");

    assert!(formatted.contains("boom"));
    assert!(formatted.starts_with("\x1b["));
    assert!(formatted.ends_with("\x1b[0m"));
}
