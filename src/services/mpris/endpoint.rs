use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use zbus::{Connection, names::BusName, zvariant::Value};

use crate::{
    bridge::{BridgeHandle, ChangedProperties, PropertySink, Published},
    services::common::Property,
};

use super::{MprisError, PlayerInterface, RootInterface, metadata};

/// Object path every MPRIS player is published at.
pub const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";

const BUS_NAME_PREFIX: &str = "org.mpris.MediaPlayer2.snapcast";
const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";
const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// How the player presents itself on the bus.
#[derive(Debug, Clone)]
pub struct EndpointSettings {
    /// Suffix of the well-known bus name
    pub instance: String,
    /// `Identity` property
    pub identity: String,
    /// `DesktopEntry` property
    pub desktop_entry: String,
}

/// Well-known name for an instance suffix.
///
/// # Errors
/// Returns `MprisError::InvalidBusName` if nothing usable is left after
/// replacing characters the bus does not allow
pub fn bus_name(instance: &str) -> Result<String, MprisError> {
    let mut element: String = instance
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if element.trim_matches('_').is_empty() {
        return Err(MprisError::InvalidBusName(format!("{BUS_NAME_PREFIX}.{instance}")));
    }
    if element.starts_with(|c: char| c.is_ascii_digit()) {
        element.insert(0, '_');
    }

    Ok(format!("{BUS_NAME_PREFIX}.{element}"))
}

/// Property values for the groups flagged in `update.changed`.
pub fn changed_values(update: &Published) -> HashMap<&'static str, Value<'static>> {
    let projection = &update.projection;
    let mut values = HashMap::new();

    if update.changed.contains(ChangedProperties::PLAYBACK_STATUS) {
        values.insert(
            "PlaybackStatus",
            Value::from(projection.playback_status.as_str()),
        );
    }
    if update.changed.contains(ChangedProperties::METADATA) {
        values.insert(
            "Metadata",
            Value::from(metadata::to_dict(&projection.metadata)),
        );
    }
    if update.changed.contains(ChangedProperties::VOLUME) {
        values.insert("Volume", Value::from(projection.volume));
    }
    if update.changed.contains(ChangedProperties::CAPABILITIES) {
        let caps = projection.capabilities;
        values.insert("CanPlay", Value::from(caps.can_play));
        values.insert("CanPause", Value::from(caps.can_pause));
        values.insert("CanSeek", Value::from(caps.can_seek));
        values.insert("CanGoNext", Value::from(caps.can_go_next));
        values.insert("CanGoPrevious", Value::from(caps.can_go_previous));
    }

    values
}

/// The media-player object on the session bus.
///
/// Holds the latest [`Published`] projection for the interfaces to read and
/// turns each update into one `PropertiesChanged` signal.
pub struct MprisEndpoint {
    connection: Connection,
    bus_name: String,
    state: Property<Published>,
}

impl MprisEndpoint {
    /// Connect to the session bus, export both interfaces and claim the name.
    ///
    /// # Arguments
    /// * `settings` - Bus name suffix and identity
    /// * `initial` - Projection served until the first update
    /// * `bridge` - Handle control calls are forwarded to
    ///
    /// # Errors
    /// Returns `MprisError` if the bus is unreachable or the name is taken
    #[instrument(skip(initial, bridge))]
    pub async fn start(
        settings: &EndpointSettings,
        initial: Published,
        bridge: BridgeHandle,
    ) -> Result<Self, MprisError> {
        let bus_name = bus_name(&settings.instance)?;
        let state = Property::new(initial);

        let connection = zbus::connection::Builder::session()?
            .name(bus_name.as_str())?
            .serve_at(
                OBJECT_PATH,
                RootInterface::new(&settings.identity, &settings.desktop_entry),
            )?
            .serve_at(OBJECT_PATH, PlayerInterface::new(state.clone(), bridge))?
            .build()
            .await?;

        info!(name = %bus_name, "Media player published on session bus");

        Ok(Self {
            connection,
            bus_name,
            state,
        })
    }

    /// Claimed well-known name.
    pub fn bus_name(&self) -> &str {
        &self.bus_name
    }

    /// Projection currently served.
    pub fn current(&self) -> Published {
        self.state.get()
    }

    async fn emit(&self, update: &Published) -> zbus::Result<()> {
        let values = changed_values(update);
        if values.is_empty() {
            return Ok(());
        }

        self.connection
            .emit_signal(
                None::<BusName<'_>>,
                OBJECT_PATH,
                PROPERTIES_INTERFACE,
                "PropertiesChanged",
                &(PLAYER_INTERFACE, values, Vec::<&str>::new()),
            )
            .await
    }
}

#[async_trait]
impl PropertySink for MprisEndpoint {
    async fn publish(&self, update: &Published) {
        self.state.set(update.clone());

        match self.emit(update).await {
            Ok(()) => debug!(revision = update.revision, changed = ?update.changed, "Emitted PropertiesChanged"),
            Err(e) => warn!("Cannot emit PropertiesChanged: {e}"),
        }
    }

    async fn close(&self) {
        let server = self.connection.object_server();

        if let Err(e) = server.remove::<PlayerInterface, _>(OBJECT_PATH).await {
            warn!("Cannot remove player interface: {e}");
        }
        if let Err(e) = server.remove::<RootInterface, _>(OBJECT_PATH).await {
            warn!("Cannot remove root interface: {e}");
        }
        if let Err(e) = self.connection.release_name(self.bus_name.as_str()).await {
            warn!("Cannot release {}: {e}", self.bus_name);
        }

        info!(name = %self.bus_name, "Media player withdrawn from session bus");
    }
}
