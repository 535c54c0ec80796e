//! Bridge between one Snapcast client and the media-player bus interface
//!
//! [`Coordinator`] owns the [`BridgeState`] and is the only place it is
//! mutated. Link events, control calls from the bus and intent deadlines
//! are all serialized through its loop; the bus side only ever sees
//! [`Published`] projections.

mod backoff;
mod coordinator;
mod error;
mod handle;
mod intents;
/// Pure mapping from Snapcast state to media-player properties
pub mod projector;
mod sink;
mod state;

pub use backoff::Backoff;
pub use coordinator::{Coordinator, CoordinatorSettings, bootstrap};
pub use error::ControlError;
pub use handle::{BridgeHandle, BridgeInbox, BridgeMessage};
pub use intents::{ControlIntent, Dispatch, IntentKind, IntentTarget, PendingIntents, Reply};
pub use projector::{Capabilities, ChangedProperties, MprisMetadata, PlaybackStatus, Projection};
pub use sink::{PropertySink, Published};
pub use state::{Applied, BridgePhase, BridgeState, TrackedTarget};
