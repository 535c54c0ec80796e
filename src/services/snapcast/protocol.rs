//! Snapcast JSON-RPC message shapes and decoding.
//!
//! The control protocol is newline-delimited JSON-RPC 2.0. Everything here
//! is pure: the link feeds raw lines in and gets typed requests, responses
//! and [`ChangeEvent`]s out.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{
    ChangeEvent, ClientSelector, ClientState, PlaybackCommand, Snapshot, SnapcastError,
    StreamCapabilities, StreamState, StreamStatus, TrackMetadata,
};

/// Method names used by the link.
pub mod method {
    /// Full server status request
    pub const GET_STATUS: &str = "Server.GetStatus";
    /// Client volume/mute request
    pub const CLIENT_SET_VOLUME: &str = "Client.SetVolume";
    /// Stream playback control request
    pub const STREAM_CONTROL: &str = "Stream.Control";
}

/// Outgoing JSON-RPC request.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    jsonrpc: &'static str,
    /// Request id, echoed by the response
    pub id: u64,
    /// Method name
    pub method: &'static str,
    #[serde(skip_serializing_if = "Value::is_null")]
    params: Value,
}

impl Request {
    fn new(id: u64, method: &'static str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }

    /// `Server.GetStatus`
    pub fn get_status(id: u64) -> Self {
        Self::new(id, method::GET_STATUS, Value::Null)
    }

    /// `Client.SetVolume` carrying only the level; the server keeps the mute flag.
    pub fn set_volume(id: u64, client_id: &str, level: u8) -> Self {
        Self::new(
            id,
            method::CLIENT_SET_VOLUME,
            json!({ "id": client_id, "volume": { "percent": level.min(100) } }),
        )
    }

    /// `Client.SetVolume` carrying only the mute flag; the server keeps the level.
    pub fn set_mute(id: u64, client_id: &str, muted: bool) -> Self {
        Self::new(
            id,
            method::CLIENT_SET_VOLUME,
            json!({ "id": client_id, "volume": { "muted": muted } }),
        )
    }

    /// `Stream.Control`
    pub fn stream_control(id: u64, stream_id: &str, command: PlaybackCommand) -> Self {
        let params = match command {
            PlaybackCommand::Seek { offset_us } => json!({
                "id": stream_id,
                "command": command.wire_name(),
                "params": { "offset": offset_us as f64 / 1_000_000.0 },
            }),
            _ => json!({ "id": stream_id, "command": command.wire_name() }),
        };
        Self::new(id, method::STREAM_CONTROL, params)
    }

    /// Serialize as one protocol line, including the trailing newline.
    ///
    /// # Errors
    /// Returns `SnapcastError::Protocol` if serialization fails
    pub fn to_line(&self) -> Result<String, SnapcastError> {
        let mut line = serde_json::to_string(self)?;
        line.push_str("\r\n");
        Ok(line)
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RpcError {
    /// Error code
    #[serde(default)]
    pub code: i64,
    /// Human readable message
    #[serde(default)]
    pub message: String,
}

/// One decoded server message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Present on responses
    #[serde(default)]
    pub id: Option<u64>,
    /// Present on notifications
    #[serde(default)]
    pub method: Option<String>,
    /// Notification parameters
    #[serde(default)]
    pub params: Value,
    /// Successful response payload
    #[serde(default)]
    pub result: Option<Value>,
    /// Failed response payload
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Incoming {
    Single(Message),
    Batch(Vec<Message>),
}

/// Parse one protocol line into its messages.
///
/// # Errors
/// Returns `SnapcastError::Protocol` for lines that are not JSON-RPC
pub fn parse_line(line: &str) -> Result<Vec<Message>, SnapcastError> {
    match serde_json::from_str::<Incoming>(line)? {
        Incoming::Single(message) => Ok(vec![message]),
        Incoming::Batch(messages) => Ok(messages),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct StatusResult {
    server: Server,
}

/// Server topology as returned by `Server.GetStatus` and `Server.OnUpdate`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Server {
    #[serde(default)]
    groups: Vec<Group>,
    #[serde(default)]
    streams: Vec<Stream>,
}

#[derive(Debug, Clone, Deserialize)]
struct Group {
    id: String,
    #[serde(default)]
    stream_id: String,
    #[serde(default)]
    clients: Vec<Client>,
}

#[derive(Debug, Clone, Deserialize)]
struct Client {
    id: String,
    #[serde(default)]
    connected: bool,
    #[serde(default)]
    config: ClientConfig,
    #[serde(default)]
    host: Host,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ClientConfig {
    #[serde(default)]
    name: String,
    #[serde(default)]
    volume: Volume,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct Host {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Volume {
    #[serde(default = "full_volume")]
    percent: u16,
    #[serde(default)]
    muted: bool,
}

impl Default for Volume {
    fn default() -> Self {
        Self {
            percent: full_volume(),
            muted: false,
        }
    }
}

fn full_volume() -> u16 {
    100
}

impl Volume {
    fn level(&self) -> u8 {
        self.percent.min(100) as u8
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Stream {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    properties: StreamProperties,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct StreamProperties {
    #[serde(default)]
    playback_status: Option<String>,
    #[serde(default)]
    can_play: bool,
    #[serde(default)]
    can_pause: bool,
    #[serde(default)]
    can_seek: bool,
    #[serde(default)]
    can_go_next: bool,
    #[serde(default)]
    can_go_previous: bool,
    #[serde(default)]
    can_control: bool,
    #[serde(default)]
    metadata: Option<StreamMetadata>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct StreamMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist: Option<Artists>,
    #[serde(default)]
    album: Option<String>,
    #[serde(default)]
    art_url: Option<String>,
    /// Seconds
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Artists {
    Many(Vec<String>),
    One(String),
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl StreamProperties {
    fn capabilities(&self) -> StreamCapabilities {
        StreamCapabilities {
            can_play: self.can_play,
            can_pause: self.can_pause,
            can_seek: self.can_seek,
            can_go_next: self.can_go_next,
            can_go_previous: self.can_go_previous,
            can_control: self.can_control,
        }
    }

    fn status(&self) -> Option<StreamStatus> {
        self.playback_status
            .as_deref()
            .map(StreamStatus::from_playback_status)
    }

    fn track_metadata(&self) -> TrackMetadata {
        let Some(meta) = self.metadata.clone() else {
            return TrackMetadata::default();
        };

        let artists = match meta.artist {
            Some(Artists::Many(list)) => list,
            Some(Artists::One(artist)) => vec![artist],
            None => Vec::new(),
        }
        .into_iter()
        .filter(|artist| !artist.trim().is_empty())
        .collect();

        let length_ms = meta
            .duration
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| (secs * 1000.0).round() as u64);

        TrackMetadata {
            title: non_empty(meta.title),
            artists,
            album: non_empty(meta.album),
            art_url: non_empty(meta.art_url),
            length_ms,
        }
    }
}

impl Stream {
    fn state(&self) -> StreamState {
        let status = self
            .properties
            .status()
            .unwrap_or_else(|| StreamStatus::from_stream_status(&self.status));

        StreamState {
            status,
            metadata: self.properties.track_metadata(),
            capabilities: self.properties.capabilities(),
        }
    }

    fn change_events(&self) -> Vec<ChangeEvent> {
        let state = self.state();
        stream_events(&self.id, Some(state.status), state.metadata, state.capabilities)
    }
}

fn stream_events(
    stream_id: &str,
    status: Option<StreamStatus>,
    metadata: TrackMetadata,
    capabilities: StreamCapabilities,
) -> Vec<ChangeEvent> {
    let mut events = Vec::with_capacity(3);
    if let Some(status) = status {
        events.push(ChangeEvent::StreamStatusChanged {
            stream_id: stream_id.to_string(),
            status,
        });
    }
    events.push(ChangeEvent::StreamMetadataChanged {
        stream_id: stream_id.to_string(),
        metadata,
    });
    events.push(ChangeEvent::StreamPropertiesChanged {
        stream_id: stream_id.to_string(),
        capabilities,
    });
    events
}

fn volume_events(client_id: &str, volume: Volume) -> Vec<ChangeEvent> {
    vec![
        ChangeEvent::ClientVolumeChanged {
            client_id: client_id.to_string(),
            level: volume.level(),
        },
        ChangeEvent::ClientMuteChanged {
            client_id: client_id.to_string(),
            muted: volume.muted,
        },
    ]
}

impl Client {
    fn matches_id(&self, selector: &ClientSelector) -> bool {
        self.id == selector.as_str()
    }

    fn matches_name(&self, selector: &ClientSelector) -> bool {
        !self.config.name.is_empty() && self.config.name == selector.as_str()
    }

    fn matches_host(&self, selector: &ClientSelector) -> bool {
        !self.host.name.is_empty() && self.host.name == selector.as_str()
    }

    fn state(&self) -> ClientState {
        ClientState {
            volume: self.config.volume.level(),
            muted: self.config.volume.muted,
            connected: self.connected,
        }
    }
}

impl Server {
    /// Decode the result of `Server.GetStatus`.
    ///
    /// # Errors
    /// Returns `SnapcastError::Protocol` if the payload has no server object
    pub fn from_status_result(result: Value) -> Result<Self, SnapcastError> {
        let status: StatusResult = serde_json::from_value(result)?;
        Ok(status.server)
    }

    /// Locate the selected client and resolve its group and stream.
    ///
    /// # Errors
    /// Returns `SnapcastError::NotFound` if no client matches the selector
    pub fn resolve(&self, selector: &ClientSelector) -> Result<Snapshot, SnapcastError> {
        let matchers: [fn(&Client, &ClientSelector) -> bool; 3] =
            [Client::matches_id, Client::matches_name, Client::matches_host];

        let found = matchers.iter().find_map(|matches| {
            self.groups.iter().find_map(|group| {
                group
                    .clients
                    .iter()
                    .find(|client| matches(client, selector))
                    .map(|client| (group, client))
            })
        });

        let Some((group, client)) = found else {
            return Err(SnapcastError::NotFound(selector.to_string()));
        };

        let stream = self
            .streams
            .iter()
            .find(|stream| stream.id == group.stream_id)
            .map(Stream::state)
            .unwrap_or_default();

        Ok(Snapshot {
            client_id: client.id.clone(),
            group_id: group.id.clone(),
            stream_id: group.stream_id.clone(),
            client: client.state(),
            stream,
        })
    }
}

#[derive(Deserialize)]
struct ClientVolumeParams {
    id: String,
    volume: Volume,
}

#[derive(Deserialize)]
struct ClientConnectParams {
    id: String,
    client: Client,
}

#[derive(Deserialize)]
struct GroupStreamParams {
    id: String,
    stream_id: String,
}

#[derive(Deserialize)]
struct StreamUpdateParams {
    stream: Stream,
}

#[derive(Deserialize)]
struct StreamPropertiesParams {
    id: String,
    properties: StreamProperties,
}

/// Decode a server notification into change events.
///
/// Notifications the bridge has no use for decode to an empty list.
///
/// # Errors
/// Returns `SnapcastError::Protocol` if a known notification has an
/// unexpected shape
pub fn decode_notification(method: &str, params: Value) -> Result<Vec<ChangeEvent>, SnapcastError> {
    let events = match method {
        "Client.OnVolumeChanged" => {
            let params: ClientVolumeParams = serde_json::from_value(params)?;
            volume_events(&params.id, params.volume)
        }
        "Client.OnConnect" => {
            let params: ClientConnectParams = serde_json::from_value(params)?;
            let mut events = vec![ChangeEvent::ClientConnectivityChanged {
                client_id: params.id.clone(),
                connected: true,
            }];
            events.extend(volume_events(&params.id, params.client.config.volume));
            events
        }
        "Client.OnDisconnect" => {
            let params: ClientConnectParams = serde_json::from_value(params)?;
            vec![ChangeEvent::ClientConnectivityChanged {
                client_id: params.id,
                connected: params.client.connected,
            }]
        }
        "Group.OnStreamChanged" => {
            let params: GroupStreamParams = serde_json::from_value(params)?;
            vec![ChangeEvent::GroupStreamReassigned {
                group_id: params.id,
                stream_id: params.stream_id,
            }]
        }
        "Stream.OnUpdate" => {
            let params: StreamUpdateParams = serde_json::from_value(params)?;
            params.stream.change_events()
        }
        "Stream.OnProperties" => {
            let params: StreamPropertiesParams = serde_json::from_value(params)?;
            stream_events(
                &params.id,
                params.properties.status(),
                params.properties.track_metadata(),
                params.properties.capabilities(),
            )
        }
        "Server.OnUpdate" => vec![ChangeEvent::TopologyChanged],
        _ => Vec::new(),
    };

    Ok(events)
}

/// Decode the result of a `Client.SetVolume` request into the events it confirms.
///
/// The server does not notify the session that issued a request, so the
/// response is the only confirmation this session sees.
///
/// # Errors
/// Returns `SnapcastError::Protocol` if the result has no volume object
pub fn decode_volume_result(client_id: &str, result: Value) -> Result<Vec<ChangeEvent>, SnapcastError> {
    #[derive(Deserialize)]
    struct VolumeResult {
        volume: Volume,
    }

    let result: VolumeResult = serde_json::from_value(result)?;
    Ok(volume_events(client_id, result.volume))
}
