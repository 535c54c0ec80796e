use std::fmt;

use crate::services::snapcast::{
    ChangeEvent, ClientSelector, ClientState, Snapshot, StreamState,
};

use super::{
    PendingIntents,
    projector::{self, ChangedProperties, Projection},
};

/// Lifecycle phase of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgePhase {
    /// No session to the server; waiting to reconnect
    Disconnected,
    /// Session open; fetching full state
    Syncing,
    /// Steady state, event driven
    Live,
    /// Shut down; no further work
    Stopped,
}

impl fmt::Display for BridgePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Syncing => write!(f, "syncing"),
            Self::Live => write!(f, "live"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// The one Snapcast client this process mirrors.
///
/// The selector never changes; group and stream are re-derived from every
/// full state fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedTarget {
    selector: ClientSelector,
    client_id: String,
    group_id: String,
    stream_id: String,
}

impl TrackedTarget {
    /// Bind a selector to the resolved ids of a snapshot.
    pub fn resolve(selector: ClientSelector, snapshot: &Snapshot) -> Self {
        Self {
            selector,
            client_id: snapshot.client_id.clone(),
            group_id: snapshot.group_id.clone(),
            stream_id: snapshot.stream_id.clone(),
        }
    }

    /// Configured selector
    pub fn selector(&self) -> &ClientSelector {
        &self.selector
    }

    /// Resolved client id
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Group the client belongs to
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Stream the group plays
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }
}

/// Outcome of applying one change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Event concerns another client, group or stream
    Ignored,
    /// Event matched but the projection is unchanged
    Unchanged,
    /// Projection changed; revision advanced
    Changed(ChangedProperties),
    /// Topology changed under the target; a full resync is required
    Resync,
}

/// Single source of truth owned by the coordinator.
#[derive(Debug)]
pub struct BridgeState {
    target: TrackedTarget,
    client: ClientState,
    stream: StreamState,
    /// Cached client and stream state came from the current server session
    fresh: bool,
    projection: Projection,
    revision: u64,
    /// Control calls issued but not yet confirmed
    pub pending: PendingIntents,
}

impl BridgeState {
    /// Build the initial state from the first full fetch. Starts at revision 1.
    pub fn new(selector: ClientSelector, snapshot: Snapshot) -> Self {
        let target = TrackedTarget::resolve(selector, &snapshot);
        let projection = projector::project(target.stream_id(), &snapshot.client, &snapshot.stream);

        Self {
            target,
            client: snapshot.client,
            stream: snapshot.stream,
            fresh: true,
            projection,
            revision: 1,
            pending: PendingIntents::new(),
        }
    }

    /// Tracked target
    pub fn target(&self) -> &TrackedTarget {
        &self.target
    }

    /// Last applied client state
    pub fn client(&self) -> &ClientState {
        &self.client
    }

    /// Last applied stream state
    pub fn stream(&self) -> &StreamState {
        &self.stream
    }

    /// Current projection
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Current revision
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply one change event from the link.
    pub fn apply(&mut self, event: &ChangeEvent) -> Applied {
        match event {
            ChangeEvent::ClientVolumeChanged { client_id, level } if *client_id == self.target.client_id => {
                self.client.volume = (*level).min(100);
            }
            ChangeEvent::ClientMuteChanged { client_id, muted } if *client_id == self.target.client_id => {
                self.client.muted = *muted;
            }
            ChangeEvent::ClientConnectivityChanged {
                client_id,
                connected,
            } if *client_id == self.target.client_id => {
                if *connected && !self.fresh {
                    return Applied::Resync;
                }
                self.client.connected = *connected;
            }
            ChangeEvent::GroupStreamReassigned {
                group_id,
                stream_id,
            } if *group_id == self.target.group_id => {
                if *stream_id == self.target.stream_id {
                    return Applied::Unchanged;
                }
                return Applied::Resync;
            }
            ChangeEvent::StreamStatusChanged { stream_id, status } if *stream_id == self.target.stream_id => {
                self.stream.status = *status;
            }
            ChangeEvent::StreamMetadataChanged {
                stream_id,
                metadata,
            } if *stream_id == self.target.stream_id => {
                self.stream.metadata = metadata.clone();
            }
            ChangeEvent::StreamPropertiesChanged {
                stream_id,
                capabilities,
            } if *stream_id == self.target.stream_id => {
                self.stream.capabilities = *capabilities;
            }
            ChangeEvent::TopologyChanged => return Applied::Resync,
            _ => return Applied::Ignored,
        }

        self.reproject()
    }

    /// Replace everything with a fresh snapshot.
    ///
    /// Always advances the revision and reports every property as changed,
    /// so consumers get a clean full refresh.
    pub fn resync(&mut self, snapshot: Snapshot) -> ChangedProperties {
        self.target = TrackedTarget::resolve(self.target.selector.clone(), &snapshot);
        self.client = snapshot.client;
        self.stream = snapshot.stream;
        self.fresh = true;
        self.projection = self.compute_projection();
        self.revision += 1;
        ChangedProperties::all()
    }

    /// The tracked client vanished from the server.
    ///
    /// The cached state is no longer backed by the server, so playback reads
    /// as stopped until a fetch succeeds. A later connect notification for
    /// the client asks for that fetch.
    pub fn client_vanished(&mut self) -> Applied {
        self.client.connected = false;
        self.fresh = false;
        self.reproject()
    }

    /// Record that the server session dropped. Playback reads as stopped
    /// until the next resync.
    pub fn link_lost(&mut self) -> Applied {
        self.fresh = false;
        self.reproject()
    }

    /// Settle every pending intent the current state already satisfies.
    pub fn confirm_pending(&mut self) -> Vec<super::IntentKind> {
        self.pending.confirm(&self.client, &self.projection)
    }

    fn compute_projection(&self) -> Projection {
        let mut projection =
            projector::project(self.target.stream_id(), &self.client, &self.stream);
        if !self.fresh {
            projection.playback_status = projector::PlaybackStatus::Stopped;
        }
        projection
    }

    fn reproject(&mut self) -> Applied {
        let projection = self.compute_projection();
        let changed = projection.diff(&self.projection);

        if changed.is_empty() {
            return Applied::Unchanged;
        }

        self.projection = projection;
        self.revision += 1;
        Applied::Changed(changed)
    }
}
