use crate::bridge::ControlError;

/// Errors raised while publishing the media-player object.
#[derive(thiserror::Error, Debug)]
pub enum MprisError {
    /// Session bus connection or name request failed
    #[error("D-Bus operation failed: {0}")]
    DbusError(#[from] zbus::Error),

    /// Configured instance produced an unusable bus name
    #[error("invalid bus name '{0}'")]
    InvalidBusName(String),
}

/// Map a bridge fault onto the bus error a caller sees.
pub(crate) fn to_fdo(error: ControlError) -> zbus::fdo::Error {
    match error {
        ControlError::Unsupported(operation) => {
            zbus::fdo::Error::NotSupported(format!("{operation} is not supported"))
        }
        other => zbus::fdo::Error::Failed(other.to_string()),
    }
}
