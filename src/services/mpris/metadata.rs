use std::collections::HashMap;

use zbus::zvariant::{ObjectPath, OwnedValue, Value};

use crate::bridge::{MprisMetadata, projector::NO_TRACK};

/// Build the `Metadata` dictionary. Absent fields are left out rather than
/// sent empty.
pub fn to_dict(metadata: &MprisMetadata) -> HashMap<String, OwnedValue> {
    let track_id = ObjectPath::try_from(metadata.track_id.as_str())
        .unwrap_or_else(|_| ObjectPath::from_static_str_unchecked(NO_TRACK));

    let mut entries: Vec<(&str, Value<'_>)> = vec![("mpris:trackid", Value::from(track_id))];

    if let Some(title) = &metadata.title {
        entries.push(("xesam:title", Value::from(title.as_str())));
    }
    if !metadata.artists.is_empty() {
        entries.push(("xesam:artist", Value::from(metadata.artists.clone())));
    }
    if let Some(album) = &metadata.album {
        entries.push(("xesam:album", Value::from(album.as_str())));
    }
    if let Some(art_url) = &metadata.art_url {
        entries.push(("mpris:artUrl", Value::from(art_url.as_str())));
    }
    if let Some(length) = metadata.length_us {
        entries.push(("mpris:length", Value::from(length)));
    }

    entries
        .into_iter()
        .filter_map(|(key, value)| {
            OwnedValue::try_from(value)
                .ok()
                .map(|value| (key.to_string(), value))
        })
        .collect()
}
