//! Pure mapping between Snapcast state and the MPRIS property model.

use bitflags::bitflags;
use sha2::{Digest, Sha256};

use crate::services::snapcast::{
    ClientState, PlaybackCommand, StreamCapabilities, StreamState, StreamStatus,
};

use super::{ControlError, ControlIntent, IntentTarget};

/// Track id MPRIS reserves for "no current track".
pub const NO_TRACK: &str = "/org/mpris/MediaPlayer2/TrackList/NoTrack";

const TRACK_PREFIX: &str = "/org/mpris/MediaPlayer2/snapcast";

/// MPRIS playback status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// A track is playing
    Playing,
    /// A track is paused
    Paused,
    /// Nothing is playing
    #[default]
    Stopped,
}

impl PlaybackStatus {
    /// Property value on the bus.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
        }
    }
}

/// Track metadata in MPRIS units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MprisMetadata {
    /// `mpris:trackid` object path
    pub track_id: String,
    /// `xesam:title`
    pub title: Option<String>,
    /// `xesam:artist`
    pub artists: Vec<String>,
    /// `xesam:album`
    pub album: Option<String>,
    /// `mpris:artUrl`
    pub art_url: Option<String>,
    /// `mpris:length` in microseconds
    pub length_us: Option<i64>,
}

impl Default for MprisMetadata {
    fn default() -> Self {
        Self {
            track_id: NO_TRACK.to_string(),
            title: None,
            artists: Vec::new(),
            album: None,
            art_url: None,
            length_us: None,
        }
    }
}

/// Control flags advertised on the player interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// `CanPlay`
    pub can_play: bool,
    /// `CanPause`
    pub can_pause: bool,
    /// `CanSeek`
    pub can_seek: bool,
    /// `CanGoNext`
    pub can_go_next: bool,
    /// `CanGoPrevious`
    pub can_go_previous: bool,
}

/// Read-only MPRIS view of the bridge state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    /// `PlaybackStatus`
    pub playback_status: PlaybackStatus,
    /// `Metadata`
    pub metadata: MprisMetadata,
    /// `Volume`, 0.0 while muted
    pub volume: f64,
    /// `CanPlay`, `CanPause`, ...
    pub capabilities: Capabilities,
}

bitflags! {
    /// Property groups that differ between two projections.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChangedProperties: u8 {
        /// `Metadata`
        const METADATA = 1;
        /// `PlaybackStatus`
        const PLAYBACK_STATUS = 1 << 1;
        /// `Volume`
        const VOLUME = 1 << 2;
        /// `CanPlay`, `CanPause`, `CanSeek`, `CanGoNext`, `CanGoPrevious`
        const CAPABILITIES = 1 << 3;
    }
}

impl Projection {
    /// Coarse diff against a previous projection.
    pub fn diff(&self, previous: &Projection) -> ChangedProperties {
        let mut changed = ChangedProperties::empty();
        changed.set(ChangedProperties::METADATA, self.metadata != previous.metadata);
        changed.set(
            ChangedProperties::PLAYBACK_STATUS,
            self.playback_status != previous.playback_status,
        );
        changed.set(ChangedProperties::VOLUME, self.volume != previous.volume);
        changed.set(
            ChangedProperties::CAPABILITIES,
            self.capabilities != previous.capabilities,
        );
        changed
    }
}

/// Project the full MPRIS view.
pub fn project(stream_id: &str, client: &ClientState, stream: &StreamState) -> Projection {
    Projection {
        playback_status: to_playback_status(stream.status),
        metadata: to_metadata(stream_id, stream),
        volume: to_volume(client),
        capabilities: can_control(&stream.capabilities),
    }
}

/// Map stream metadata to MPRIS units.
///
/// The track id depends only on the stream and the title/artists, so
/// consumers see a new track only when that content changes.
pub fn to_metadata(stream_id: &str, stream: &StreamState) -> MprisMetadata {
    let source = &stream.metadata;

    MprisMetadata {
        track_id: track_id(stream_id, source.title.as_deref(), &source.artists),
        title: source.title.clone(),
        artists: source.artists.clone(),
        album: source.album.clone(),
        art_url: source.art_url.clone(),
        length_us: source
            .length_ms
            .and_then(|ms| i64::try_from(ms.saturating_mul(1000)).ok()),
    }
}

fn track_id(stream_id: &str, title: Option<&str>, artists: &[String]) -> String {
    if title.is_none() && artists.is_empty() {
        return NO_TRACK.to_string();
    }

    let mut hasher = Sha256::new();
    hasher.update(title.unwrap_or_default().as_bytes());
    for artist in artists {
        hasher.update([0x1f_u8]);
        hasher.update(artist.as_bytes());
    }
    let digest = hasher.finalize();

    format!(
        "{TRACK_PREFIX}/{}/t{}",
        sanitize_path_element(stream_id),
        hex::encode(&digest[..8])
    )
}

/// Reduce arbitrary text to a valid D-Bus object path element.
pub fn sanitize_path_element(raw: &str) -> String {
    let sanitized: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

/// `unknown` maps to `Stopped`.
pub fn to_playback_status(status: StreamStatus) -> PlaybackStatus {
    match status {
        StreamStatus::Playing => PlaybackStatus::Playing,
        StreamStatus::Paused => PlaybackStatus::Paused,
        StreamStatus::Stopped | StreamStatus::Unknown => PlaybackStatus::Stopped,
    }
}

/// Linear 0-100 → 0.0-1.0; a muted client reads as silent.
pub fn to_volume(client: &ClientState) -> f64 {
    if client.muted {
        0.0
    } else {
        f64::from(client.volume.min(100)) / 100.0
    }
}

/// 0.0-1.0 → 0-100, rounded and clamped. NaN maps to 0.
pub fn from_volume(volume: f64) -> u8 {
    if volume.is_nan() {
        return 0;
    }
    (volume.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Mirror the server capability flags; without `canControl` nothing is advertised.
pub fn can_control(caps: &StreamCapabilities) -> Capabilities {
    if !caps.can_control {
        return Capabilities::default();
    }

    Capabilities {
        can_play: caps.can_play,
        can_pause: caps.can_pause,
        can_seek: caps.can_seek,
        can_go_next: caps.can_go_next,
        can_go_previous: caps.can_go_previous,
    }
}

/// Resolve a control intent into the requests that carry it out.
///
/// # Errors
/// Returns `ControlError::Unsupported` when the stream capabilities do not
/// allow the action; nothing is sent in that case.
pub fn to_targets(
    intent: ControlIntent,
    client: &ClientState,
    stream: &StreamState,
    projection: &Projection,
) -> Result<Vec<IntentTarget>, ControlError> {
    let playback = |command: PlaybackCommand,
                    expect: PlaybackStatus|
     -> Result<Vec<IntentTarget>, ControlError> {
        ensure_allowed(command, &stream.capabilities)?;
        Ok(vec![IntentTarget::Playback { command, expect }])
    };

    match intent {
        ControlIntent::Play => playback(PlaybackCommand::Play, PlaybackStatus::Playing),
        ControlIntent::Pause => playback(PlaybackCommand::Pause, PlaybackStatus::Paused),
        ControlIntent::Stop => playback(PlaybackCommand::Stop, PlaybackStatus::Stopped),
        ControlIntent::PlayPause => {
            let expect = match projection.playback_status {
                PlaybackStatus::Playing => PlaybackStatus::Paused,
                _ => PlaybackStatus::Playing,
            };
            playback(PlaybackCommand::PlayPause, expect)
        }
        ControlIntent::Next | ControlIntent::Previous => {
            let command = if intent == ControlIntent::Next {
                PlaybackCommand::Next
            } else {
                PlaybackCommand::Previous
            };
            ensure_allowed(command, &stream.capabilities)?;
            Ok(vec![IntentTarget::Track {
                command,
                from: projection.metadata.track_id.clone(),
            }])
        }
        ControlIntent::Seek(offset_us) => {
            let command = PlaybackCommand::Seek { offset_us };
            ensure_allowed(command, &stream.capabilities)?;
            Ok(vec![IntentTarget::Seek(command)])
        }
        ControlIntent::SetVolume(volume) => {
            let level = from_volume(volume);
            let mut targets = vec![IntentTarget::Volume(level)];
            if client.muted && level > 0 {
                targets.push(IntentTarget::Mute(false));
            }
            Ok(targets)
        }
    }
}

fn ensure_allowed(command: PlaybackCommand, caps: &StreamCapabilities) -> Result<(), ControlError> {
    if command.is_allowed_by(caps) {
        Ok(())
    } else {
        Err(ControlError::Unsupported(command.to_string()))
    }
}
