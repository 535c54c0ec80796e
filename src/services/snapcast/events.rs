use super::{SnapcastError, StreamCapabilities, StreamStatus, TrackMetadata};

/// Change notifications produced by the Snapcast link.
///
/// Events carry server identifiers; filtering against the tracked target is
/// left to the consumer. `Disconnected` is always the last event of a
/// subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Client volume level changed
    ClientVolumeChanged {
        /// Client that changed
        client_id: String,
        /// New level in percent
        level: u8,
    },

    /// Client mute state changed
    ClientMuteChanged {
        /// Client that changed
        client_id: String,
        /// New mute flag
        muted: bool,
    },

    /// Client connected to or disconnected from the server
    ClientConnectivityChanged {
        /// Client that changed
        client_id: String,
        /// Whether the client is now connected
        connected: bool,
    },

    /// A group switched to a different stream
    GroupStreamReassigned {
        /// Group that switched
        group_id: String,
        /// Stream the group now plays
        stream_id: String,
    },

    /// Stream playback status changed
    StreamStatusChanged {
        /// Stream that changed
        stream_id: String,
        /// New status
        status: StreamStatus,
    },

    /// Stream track metadata changed
    StreamMetadataChanged {
        /// Stream that changed
        stream_id: String,
        /// New metadata
        metadata: TrackMetadata,
    },

    /// Stream control capabilities changed
    StreamPropertiesChanged {
        /// Stream that changed
        stream_id: String,
        /// New capability flags
        capabilities: StreamCapabilities,
    },

    /// The server pushed a full topology update (clients moved, groups
    /// created or removed)
    TopologyChanged,

    /// The session ended; no further events follow
    Disconnected {
        /// Why the session ended
        reason: String,
    },
}

impl ChangeEvent {
    /// Whether this event ends the subscription.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }
}

/// One item of a link subscription: a decoded event, or a message the link
/// could not decode.
pub type LinkItem = Result<ChangeEvent, SnapcastError>;
