use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::services::snapcast::SnapcastError;

use super::{ControlError, ControlIntent, IntentKind, intents::Reply};

const INBOX_CAPACITY: usize = 64;

/// Messages funneled into the coordinator loop.
#[derive(Debug)]
pub enum BridgeMessage {
    /// Control call from the media-player interface
    Control {
        /// Requested action
        intent: ControlIntent,
        /// Answered once the request is acknowledged or refused
        reply: Reply,
    },

    /// An RPC spawned by the loop finished
    Dispatched {
        /// Intent slot the RPC belongs to
        kind: IntentKind,
        /// Sequence number issued when the RPC was dispatched
        seq: u64,
        /// Server acknowledgement or failure
        outcome: Result<(), SnapcastError>,
    },

    /// Stop the loop
    Shutdown,
}

/// Receiving side of the coordinator inbox.
pub type BridgeInbox = mpsc::Receiver<BridgeMessage>;

/// Cloneable sender into the coordinator loop.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    tx: mpsc::Sender<BridgeMessage>,
}

impl BridgeHandle {
    /// Create a handle and the inbox the coordinator consumes.
    pub fn channel() -> (Self, BridgeInbox) {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        (Self { tx }, rx)
    }

    /// Submit a control intent and wait until it is accepted or refused.
    ///
    /// # Errors
    /// Returns the fault reported by the coordinator, or
    /// `ControlError::ShuttingDown` if the loop is gone
    pub async fn control(&self, intent: ControlIntent) -> Result<(), ControlError> {
        let (reply, outcome) = oneshot::channel();

        self.tx
            .send(BridgeMessage::Control { intent, reply })
            .await
            .map_err(|_| ControlError::ShuttingDown)?;

        outcome.await.unwrap_or(Err(ControlError::ShuttingDown))
    }

    /// Ask the coordinator to stop.
    pub async fn shutdown(&self) {
        if self.tx.send(BridgeMessage::Shutdown).await.is_err() {
            debug!("Coordinator already stopped");
        }
    }

    pub(super) async fn dispatched(
        &self,
        kind: IntentKind,
        seq: u64,
        outcome: Result<(), SnapcastError>,
    ) {
        let _ = self
            .tx
            .send(BridgeMessage::Dispatched { kind, seq, outcome })
            .await;
    }
}
