mod log_level;

pub use log_level::LogLevel;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct GeneralConfig {
    /// Logging level, overridden by `RUST_LOG`.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Also write logs to a daily rotated file in the state directory.
    #[serde(default)]
    pub log_to_file: bool,
}
