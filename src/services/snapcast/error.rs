use super::PlaybackCommand;

/// Errors reported by the Snapcast link.
///
/// The link never retries or suppresses these; the bridge coordinator
/// decides the policy for each variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SnapcastError {
    /// Transport-level failure (connect refused, socket closed, write failed)
    #[error("connection to snapcast server failed: {0}")]
    Connection(String),

    /// Tracked client is absent from the server state
    #[error("client '{0}' not found on snapcast server")]
    NotFound(String),

    /// The server rejected or never answered an issued request
    #[error("snapcast request '{method}' failed: {reason}")]
    Request {
        /// JSON-RPC method that failed
        method: String,
        /// Error message reported by the server (or the local timeout)
        reason: String,
    },

    /// The stream's capability flags disallow the command
    #[error("stream '{stream_id}' does not support {command}")]
    Unsupported {
        /// Stream the command was aimed at
        stream_id: String,
        /// Command that was refused
        command: PlaybackCommand,
    },

    /// Malformed or unexpected message from the server
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SnapcastError {
    /// Whether this error means the session is gone and must be re-established.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl From<std::io::Error> for SnapcastError {
    fn from(error: std::io::Error) -> Self {
        Self::Connection(error.to_string())
    }
}

impl From<serde_json::Error> for SnapcastError {
    fn from(error: serde_json::Error) -> Self {
        Self::Protocol(error.to_string())
    }
}
