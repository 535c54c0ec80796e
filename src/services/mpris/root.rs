use zbus::interface;

/// `org.mpris.MediaPlayer2`: identity of the bridged player.
///
/// The bridge has no window and cannot be quit over the bus, so every
/// capability here is false.
#[derive(Debug, Clone)]
pub struct RootInterface {
    identity: String,
    desktop_entry: String,
}

impl RootInterface {
    /// # Arguments
    /// * `identity` - Human readable player name
    /// * `desktop_entry` - Desktop file basename, may be empty
    pub fn new(identity: impl Into<String>, desktop_entry: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            desktop_entry: desktop_entry.into(),
        }
    }
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootInterface {
    async fn raise(&self) {}

    async fn quit(&self) {}

    #[zbus(property)]
    async fn can_quit(&self) -> bool {
        false
    }

    #[zbus(property)]
    async fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    async fn can_set_fullscreen(&self) -> bool {
        false
    }

    #[zbus(property)]
    async fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    async fn identity(&self) -> String {
        self.identity.clone()
    }

    #[zbus(property)]
    async fn desktop_entry(&self) -> String {
        self.desktop_entry.clone()
    }

    #[zbus(property)]
    async fn supported_uri_schemes(&self) -> Vec<String> {
        Vec::new()
    }

    #[zbus(property)]
    async fn supported_mime_types(&self) -> Vec<String> {
        Vec::new()
    }
}
