/// Snapcast link error types
pub mod error;
/// Change events emitted by the link
pub mod events;
/// Link trait and TCP implementation
pub mod link;
/// JSON-RPC message shapes and decoding
pub mod protocol;
/// Client, stream and command types
pub mod types;

pub use error::*;
pub use events::*;
pub use link::{SnapcastLink, TcpLink};
pub use types::*;
