use crate::services::snapcast::SnapcastError;

use super::IntentKind;

/// Faults reported back to the caller of a control method.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// The stream cannot honor the operation
    #[error("{0} is not supported by the current stream")]
    Unsupported(String),

    /// The server rejected the request
    #[error("snapcast rejected the request: {0}")]
    Rejected(String),

    /// No live session to the server
    #[error("not connected to the snapcast server")]
    Disconnected,

    /// The request was accepted but never confirmed in time
    #[error("{0:?} change was not confirmed by the server in time")]
    TimedOut(IntentKind),

    /// The tracked client moved to a different stream before confirmation
    #[error("tracked stream changed before the request was confirmed")]
    StreamChanged,

    /// The bridge is shutting down
    #[error("bridge is shutting down")]
    ShuttingDown,
}

impl From<SnapcastError> for ControlError {
    fn from(error: SnapcastError) -> Self {
        match error {
            SnapcastError::Unsupported { command, .. } => Self::Unsupported(command.to_string()),
            SnapcastError::Connection(_) => Self::Disconnected,
            other => Self::Rejected(other.to_string()),
        }
    }
}
