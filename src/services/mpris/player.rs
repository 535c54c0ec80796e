use std::collections::HashMap;

use tracing::debug;
use zbus::{fdo, interface, zvariant::{ObjectPath, OwnedValue}};

use crate::{
    bridge::{BridgeHandle, Capabilities, ControlIntent, Published},
    services::common::Property,
};

use super::{error::to_fdo, metadata};

/// `org.mpris.MediaPlayer2.Player` backed by the latest published projection.
///
/// Property reads never touch the server. Change signals are emitted in
/// batches by [`super::MprisEndpoint`], so every property here opts out of
/// the per-property signal.
pub struct PlayerInterface {
    state: Property<Published>,
    bridge: BridgeHandle,
}

impl PlayerInterface {
    /// # Arguments
    /// * `state` - Projection cell shared with the endpoint
    /// * `bridge` - Coordinator handle control calls are forwarded to
    pub fn new(state: Property<Published>, bridge: BridgeHandle) -> Self {
        Self { state, bridge }
    }

    fn capabilities(&self) -> Capabilities {
        self.state.get().projection.capabilities
    }

    async fn forward(&self, intent: ControlIntent, allowed: bool) -> fdo::Result<()> {
        if !allowed {
            debug!(%intent, "Rejecting control call; capability not advertised");
            return Err(fdo::Error::NotSupported(format!(
                "{intent} is not supported by the current stream"
            )));
        }
        self.bridge.control(intent).await.map_err(to_fdo)
    }
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerInterface {
    async fn next(&self) -> fdo::Result<()> {
        let allowed = self.capabilities().can_go_next;
        self.forward(ControlIntent::Next, allowed).await
    }

    async fn previous(&self) -> fdo::Result<()> {
        let allowed = self.capabilities().can_go_previous;
        self.forward(ControlIntent::Previous, allowed).await
    }

    async fn pause(&self) -> fdo::Result<()> {
        let allowed = self.capabilities().can_pause;
        self.forward(ControlIntent::Pause, allowed).await
    }

    async fn play_pause(&self) -> fdo::Result<()> {
        let allowed = self.capabilities().can_pause;
        self.forward(ControlIntent::PlayPause, allowed).await
    }

    async fn stop(&self) -> fdo::Result<()> {
        self.forward(ControlIntent::Stop, true).await
    }

    async fn play(&self) -> fdo::Result<()> {
        let allowed = self.capabilities().can_play;
        self.forward(ControlIntent::Play, allowed).await
    }

    async fn seek(&self, offset: i64) -> fdo::Result<()> {
        let allowed = self.capabilities().can_seek;
        self.forward(ControlIntent::Seek(offset), allowed).await
    }

    async fn set_position(&self, _track_id: ObjectPath<'_>, _position: i64) -> fdo::Result<()> {
        Err(fdo::Error::NotSupported(
            "SetPosition is not supported".to_string(),
        ))
    }

    async fn open_uri(&self, _uri: &str) -> fdo::Result<()> {
        Err(fdo::Error::NotSupported("OpenUri is not supported".to_string()))
    }

    #[zbus(property(emits_changed_signal = "false"))]
    async fn playback_status(&self) -> String {
        self.state.get().projection.playback_status.as_str().to_string()
    }

    #[zbus(property(emits_changed_signal = "false"))]
    async fn metadata(&self) -> HashMap<String, OwnedValue> {
        metadata::to_dict(&self.state.get().projection.metadata)
    }

    #[zbus(property(emits_changed_signal = "false"))]
    async fn volume(&self) -> f64 {
        self.state.get().projection.volume
    }

    #[zbus(property)]
    async fn set_volume(&self, volume: f64) -> fdo::Result<()> {
        self.forward(ControlIntent::SetVolume(volume), true).await
    }

    #[zbus(property(emits_changed_signal = "false"))]
    async fn position(&self) -> i64 {
        0
    }

    #[zbus(property(emits_changed_signal = "const"))]
    async fn rate(&self) -> f64 {
        1.0
    }

    #[zbus(property(emits_changed_signal = "const"))]
    async fn minimum_rate(&self) -> f64 {
        1.0
    }

    #[zbus(property(emits_changed_signal = "const"))]
    async fn maximum_rate(&self) -> f64 {
        1.0
    }

    #[zbus(property(emits_changed_signal = "false"))]
    async fn can_go_next(&self) -> bool {
        self.capabilities().can_go_next
    }

    #[zbus(property(emits_changed_signal = "false"))]
    async fn can_go_previous(&self) -> bool {
        self.capabilities().can_go_previous
    }

    #[zbus(property(emits_changed_signal = "false"))]
    async fn can_play(&self) -> bool {
        self.capabilities().can_play
    }

    #[zbus(property(emits_changed_signal = "false"))]
    async fn can_pause(&self) -> bool {
        self.capabilities().can_pause
    }

    #[zbus(property(emits_changed_signal = "false"))]
    async fn can_seek(&self) -> bool {
        self.capabilities().can_seek
    }

    #[zbus(property(emits_changed_signal = "const"))]
    async fn can_control(&self) -> bool {
        true
    }
}
