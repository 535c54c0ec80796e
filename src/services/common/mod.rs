//! Shared building blocks for services

/// Watchable single-writer values
pub mod property;

pub use property::Property;
