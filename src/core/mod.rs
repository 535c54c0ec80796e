use std::{fmt, io, path::Path, process::ExitCode};

use thiserror::Error;

use crate::services::{MprisError, SnapcastError};

/// Error types for the bridge process.
///
/// Covers configuration loading and the failures that end the process.
/// Each variant maps to a process exit code.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration field missing or invalid
    #[error("invalid config field '{field}' in {component}: {reason}")]
    InvalidConfigField {
        /// The field that is invalid
        field: String,
        /// Section containing the field
        component: String,
        /// Reason why the field is invalid
        reason: String,
    },

    /// I/O operation error
    #[error("I/O error on '{path}': {details}")]
    IoError {
        /// Path where I/O error occurred
        path: std::path::PathBuf,
        /// I/O error details
        details: String,
    },

    /// Standard I/O operation error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// TOML parsing error with location context
    #[error("failed to parse TOML at '{location}': {details}")]
    TomlParseError {
        /// Location of TOML being parsed (file path or "string")
        location: String,
        /// Parse error details
        details: String,
    },

    /// Logging could not be set up
    #[error("failed to initialize logging: {0}")]
    Logging(String),

    /// Snapcast server failure that ends the process
    #[error(transparent)]
    Snapcast(#[from] SnapcastError),

    /// Session bus failure
    #[error(transparent)]
    Bus(#[from] MprisError),

    /// The bridge task ended abnormally
    #[error("bridge task failed: {0}")]
    Fault(String),
}

/// A specialized `Result` type for bridge setup operations.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Creates a TOML parsing error with optional file path context.
    ///
    /// # Arguments
    ///
    /// * `error` - The underlying parsing error
    /// * `path` - Optional path to the file that failed to parse
    pub fn toml_parse(error: impl fmt::Display, path: Option<&Path>) -> Self {
        let location = match path {
            Some(p) => {
                let clean_path = p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
                clean_path.to_string_lossy().to_string()
            }
            None => "string".to_string(),
        };

        AppError::TomlParseError {
            location,
            details: error.to_string(),
        }
    }

    /// Process exit status for this error.
    ///
    /// 2 for configuration problems (including a tracked client the server
    /// does not know), 3 for bus failures, 1 for everything else.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    fn exit_status(&self) -> u8 {
        match self {
            AppError::InvalidConfigField { .. }
            | AppError::IoError { .. }
            | AppError::TomlParseError { .. }
            | AppError::Snapcast(SnapcastError::NotFound(_)) => 2,
            AppError::Bus(_) => 3,
            AppError::Io(_)
            | AppError::Logging(_)
            | AppError::Snapcast(_)
            | AppError::Fault(_) => 1,
        }
    }
}
