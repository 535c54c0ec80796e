//! Unit tests for config module
//!
//! Tests configuration types, defaults, and validation.
//! No filesystem dependencies - all in-memory.

#![allow(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use crate::config::{Config, LogLevel};

#[test]
fn config_defaults() {
    let config = Config::default();

    assert_eq!(config.general.log_level, LogLevel::Info);
    assert!(!config.general.log_to_file);
    assert_eq!(config.snapcast.address(), "127.0.0.1:1705");
    assert_eq!(config.bridge.intent_timeout_ms, 3_000);
    assert_eq!(config.bridge.backoff_initial_ms, 500);
    assert_eq!(config.bridge.backoff_max_ms, 30_000);
    assert!(config.bridge.degrade_on_disconnect);
    assert_eq!(config.mpris.identity, "Snapcast");
}

#[test]
fn config_serialize_toml() {
    let toml_str = toml::to_string(&Config::default()).unwrap();

    for section in ["[general]", "[snapcast]", "[bridge]", "[mpris]"] {
        assert!(toml_str.contains(section), "missing {section}");
    }
}

#[test]
fn config_deserialize_toml() {
    let toml_str = r#"
        [general]
        log_level = "debug"

        [snapcast]
        host = "music.local"
        client = "Kitchen"

        [bridge]
        degrade_on_disconnect = false
    "#;

    let config = Config::from_toml_str(toml_str).unwrap();

    assert_eq!(config.general.log_level, LogLevel::Debug);
    assert_eq!(config.snapcast.address(), "music.local:1705");
    assert_eq!(config.snapcast.selector().as_str(), "Kitchen");
    assert!(!config.bridge.degrade_on_disconnect);
    assert_eq!(config.bridge.intent_timeout_ms, 3_000);
}

#[test]
fn config_empty_toml() {
    let config = Config::from_toml_str("").unwrap();

    assert_eq!(config, Config::default());
}

#[test]
fn config_unknown_log_level_is_rejected() {
    let result = Config::from_toml_str("[general]\nlog_level = \"loud\"\n");

    assert!(result.is_err());
}

#[test]
fn validation_requires_client() {
    let config = Config::default();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("client"));
}

#[test]
fn validation_rejects_port_zero() {
    let mut config = Config::default();
    config.snapcast.client = "Kitchen".into();
    config.snapcast.port = 0;

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("port"));
}

#[test]
fn validation_rejects_inverted_backoff() {
    let mut config = Config::default();
    config.snapcast.client = "Kitchen".into();
    config.bridge.backoff_initial_ms = 60_000;

    assert!(config.validate().is_err());
}

#[test]
fn valid_config_passes() {
    let mut config = Config::default();
    config.snapcast.client = "Kitchen".into();

    assert!(config.validate().is_ok());
}

#[test]
fn ipv6_hosts_are_bracketed() {
    let mut config = Config::default();
    config.snapcast.host = "::1".into();

    assert_eq!(config.snapcast.address(), "[::1]:1705");
}

#[test]
fn mpris_instance_defaults_to_client() {
    let config = Config::default();

    assert_eq!(config.mpris.endpoint_settings("Kitchen").instance, "Kitchen");
}

#[test]
fn log_level_parses_case_insensitively() {
    assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warn));
    assert!("loud".parse::<LogLevel>().is_err());
}

#[test]
fn schema_lists_sections() {
    let schema = Config::json_schema().unwrap();

    assert!(schema.contains("snapcast"));
    assert!(schema.contains("degrade_on_disconnect"));
}
