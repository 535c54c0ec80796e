//! MPRIS media-player object for the bridged Snapcast client

mod endpoint;
mod error;
/// `Metadata` dictionary construction
pub mod metadata;
mod player;
mod root;

pub use endpoint::{EndpointSettings, MprisEndpoint, OBJECT_PATH, bus_name, changed_values};
pub use error::MprisError;
pub use player::PlayerInterface;
pub use root::RootInterface;
