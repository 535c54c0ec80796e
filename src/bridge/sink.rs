use async_trait::async_trait;

use super::projector::{ChangedProperties, Projection};

/// One revision of the projection, as handed to the bus side.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    /// Bridge revision this projection belongs to
    pub revision: u64,
    /// Full projection
    pub projection: Projection,
    /// Property groups that changed since the previous revision
    pub changed: ChangedProperties,
}

/// Receiver of projection updates; implemented by the MPRIS endpoint.
///
/// The coordinator calls `publish` only when the revision advances, once
/// per processed event.
#[async_trait]
pub trait PropertySink: Send + Sync + 'static {
    /// Store the new projection and emit change signals for `update.changed`.
    async fn publish(&self, update: &Published);

    /// Withdraw from the bus. Called once when the bridge stops.
    async fn close(&self) {}
}
