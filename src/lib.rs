//! snapcast-mpris - expose one Snapcast client as an MPRIS media player.
//!
//! The bridge follows a single client on a snapserver, mirrors its stream's
//! playback state, metadata and the client volume onto the session bus, and
//! forwards media-key style control calls back to the server.
//!
//! - [`services::snapcast`] speaks the snapserver JSON-RPC control protocol
//! - [`bridge`] holds the state machine and the pure projection to MPRIS
//! - [`services::mpris`] publishes the result on the session bus

/// State machine tying the Snapcast link to the bus endpoint.
pub mod bridge;

/// Command-line interface.
pub mod cli;

/// Configuration schema definitions and loading.
pub mod config;

/// Core error types and result aliases.
pub mod core;

/// Snapcast, MPRIS and shared service building blocks.
pub mod services;

/// Logging setup.
pub mod tracing_config;

/// Re-exported core types for convenience.
pub use crate::core::{AppError, Result};
