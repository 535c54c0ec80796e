use std::fmt;

/// Volume, mute and presence of the tracked Snapcast client.
///
/// Refreshed only from server state; never guessed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientState {
    /// Volume level in percent (0-100)
    pub volume: u8,

    /// Whether the client is muted
    pub muted: bool,

    /// Whether the physical client is currently connected to the server
    pub connected: bool,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            volume: 100,
            muted: false,
            connected: false,
        }
    }
}

/// Playback status of a Snapcast stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    /// Stream is producing audio
    Playing,

    /// Stream is paused by its source
    Paused,

    /// Stream is stopped or idle
    Stopped,

    /// Server did not report a recognizable status
    #[default]
    Unknown,
}

impl StreamStatus {
    /// Decode the `playbackStatus` stream property.
    pub fn from_playback_status(status: &str) -> Self {
        match status {
            "playing" => Self::Playing,
            "paused" => Self::Paused,
            "stopped" => Self::Stopped,
            _ => Self::Unknown,
        }
    }

    /// Decode the stream-level `status` field (`playing`, `idle`, `disabled`, ...).
    pub fn from_stream_status(status: &str) -> Self {
        match status {
            "playing" => Self::Playing,
            "idle" => Self::Stopped,
            _ => Self::Unknown,
        }
    }
}

/// Track metadata reported for a stream. Absent fields stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackMetadata {
    /// Track title
    pub title: Option<String>,

    /// Track artists, in server order
    pub artists: Vec<String>,

    /// Album name
    pub album: Option<String>,

    /// Artwork URL, passed through untouched
    pub art_url: Option<String>,

    /// Track length in milliseconds
    pub length_ms: Option<u64>,
}

/// Control capability flags reported by the server for a stream.
///
/// Flags the server omits are `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamCapabilities {
    /// Stream accepts `play`
    pub can_play: bool,
    /// Stream accepts `pause`
    pub can_pause: bool,
    /// Stream accepts `seek`
    pub can_seek: bool,
    /// Stream accepts `next`
    pub can_go_next: bool,
    /// Stream accepts `previous`
    pub can_go_previous: bool,
    /// Stream accepts control commands at all
    pub can_control: bool,
}

/// Playback state of the stream the tracked client's group is playing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamState {
    /// Playback status
    pub status: StreamStatus,

    /// Current track metadata
    pub metadata: TrackMetadata,

    /// Control capabilities
    pub capabilities: StreamCapabilities,
}

/// Full state of the tracked client resolved against the server topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Server-side client identifier
    pub client_id: String,

    /// Group the client currently belongs to
    pub group_id: String,

    /// Stream that group is playing
    pub stream_id: String,

    /// Client volume and presence
    pub client: ClientState,

    /// Stream playback state
    pub stream: StreamState,
}

/// Selects the Snapcast client to mirror.
///
/// Matches a client id first, then the configured client name, then the
/// client's host name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientSelector(String);

impl ClientSelector {
    /// Create a selector from a configured client id or name
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    /// Raw selector text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playback command sent to a stream via `Stream.Control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    /// Start playback
    Play,
    /// Pause playback
    Pause,
    /// Toggle between playing and paused
    PlayPause,
    /// Skip to the next track
    Next,
    /// Skip to the previous track
    Previous,
    /// Stop playback
    Stop,
    /// Seek relative to the current position, in microseconds
    Seek {
        /// Offset in microseconds; negative seeks backwards
        offset_us: i64,
    },
}

impl PlaybackCommand {
    /// Command name on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::PlayPause => "playPause",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Stop => "stop",
            Self::Seek { .. } => "seek",
        }
    }

    /// Whether the given capability flags allow this command.
    pub fn is_allowed_by(&self, caps: &StreamCapabilities) -> bool {
        if !caps.can_control {
            return false;
        }

        match self {
            Self::Play => caps.can_play,
            Self::Pause | Self::PlayPause => caps.can_pause,
            Self::Next => caps.can_go_next,
            Self::Previous => caps.can_go_previous,
            Self::Stop => true,
            Self::Seek { .. } => caps.can_seek,
        }
    }
}

impl fmt::Display for PlaybackCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seek { offset_us } => write!(f, "seek({offset_us}us)"),
            other => write!(f, "{}", other.wire_name()),
        }
    }
}
