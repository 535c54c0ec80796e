/// Shared service building blocks
pub mod common;
/// MPRIS media-player endpoint
pub mod mpris;
/// Snapcast control-protocol client
pub mod snapcast;

pub use mpris::{MprisEndpoint, MprisError};
pub use snapcast::{SnapcastError, SnapcastLink, TcpLink};
