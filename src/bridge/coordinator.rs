use std::{sync::Arc, time::Duration};

use futures::{StreamExt, stream::BoxStream};
use tokio::time::{self, Instant};
use tracing::{debug, info, instrument, warn};

use crate::services::{
    common::Property,
    snapcast::{
        ChangeEvent, ClientSelector, LinkItem, PlaybackCommand, Snapshot, SnapcastError,
        SnapcastLink,
    },
};

use super::{
    Applied, Backoff, BridgeHandle, BridgeInbox, BridgeMessage, BridgePhase, BridgeState,
    ControlError, ControlIntent, Dispatch, IntentKind, IntentTarget, PropertySink, Published,
    intents::Reply,
    projector::{self, ChangedProperties},
};

/// Tunables for the coordinator loop.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// `host:port` of the Snapcast control port
    pub address: String,
    /// How long a control intent may wait for its confirming event
    pub intent_timeout: Duration,
    /// Reconnect schedule
    pub backoff: Backoff,
    /// Publish `Stopped` once when the server session drops
    pub degrade_on_disconnect: bool,
}

enum LiveExit {
    Shutdown,
    Resync,
    Disconnected(String),
}

enum SyncOutcome {
    Live,
    Lost(String),
}

/// Connect and fetch the initial state of the tracked client.
///
/// Connection failures are retried on the backoff schedule; a client that
/// does not exist is fatal.
///
/// # Errors
/// Returns `SnapcastError::NotFound` when the selector matches no client, or
/// `SnapcastError::Protocol` when the server status cannot be decoded
#[instrument(skip(link, backoff))]
pub async fn bootstrap<L: SnapcastLink>(
    link: &L,
    address: &str,
    selector: &ClientSelector,
    backoff: &mut Backoff,
) -> Result<Snapshot, SnapcastError> {
    loop {
        let attempt = match link.connect(address).await {
            Ok(()) => link.current_state(selector).await,
            Err(e) => Err(e),
        };

        match attempt {
            Ok(snapshot) => {
                backoff.reset();
                info!(
                    client = %snapshot.client_id,
                    group = %snapshot.group_id,
                    stream = %snapshot.stream_id,
                    "Resolved tracked client"
                );
                return Ok(snapshot);
            }
            Err(e @ (SnapcastError::NotFound(_) | SnapcastError::Protocol(_))) => return Err(e),
            Err(e) => {
                let delay = backoff.next_delay();
                warn!("Initial connection failed: {e}; retrying in {delay:?}");
                time::sleep(delay).await;
            }
        }
    }
}

/// Owner of [`BridgeState`]: serializes link events, control calls and
/// intent deadlines through one loop.
pub struct Coordinator<L: SnapcastLink, S: PropertySink> {
    link: Arc<L>,
    sink: Arc<S>,
    handle: BridgeHandle,
    inbox: BridgeInbox,
    settings: CoordinatorSettings,
    state: BridgeState,
    phase: Property<BridgePhase>,
}

impl<L: SnapcastLink, S: PropertySink> Coordinator<L, S> {
    /// Create a coordinator over an already connected link.
    ///
    /// # Arguments
    /// * `link` - Link whose session produced `state`
    /// * `sink` - Receiver of projection updates
    /// * `channel` - Pair from [`BridgeHandle::channel`]; the handle reports RPC results
    /// * `settings` - Loop tunables
    /// * `state` - State built from the initial fetch
    pub fn new(
        link: Arc<L>,
        sink: Arc<S>,
        (handle, inbox): (BridgeHandle, BridgeInbox),
        settings: CoordinatorSettings,
        state: BridgeState,
    ) -> Self {
        Self {
            link,
            sink,
            handle,
            inbox,
            settings,
            state,
            phase: Property::new(BridgePhase::Syncing),
        }
    }

    /// Observable lifecycle phase.
    pub fn phase(&self) -> Property<BridgePhase> {
        self.phase.clone()
    }

    /// Full projection at the current revision.
    pub fn published(&self) -> Published {
        Published {
            revision: self.state.revision(),
            projection: self.state.projection().clone(),
            changed: ChangedProperties::all(),
        }
    }

    /// Run until shutdown.
    #[instrument(skip(self), fields(client = %self.state.target().selector()))]
    pub async fn run(mut self) {
        let mut events = self.link.subscribe();
        self.phase.set(BridgePhase::Live);
        info!("Bridge live");

        loop {
            match self.run_live(&mut events).await {
                LiveExit::Shutdown => break,
                LiveExit::Resync => {
                    self.phase.set(BridgePhase::Syncing);
                    match self.sync().await {
                        SyncOutcome::Live => continue,
                        SyncOutcome::Lost(reason) => self.enter_disconnected(reason).await,
                    }
                }
                LiveExit::Disconnected(reason) => self.enter_disconnected(reason).await,
            }

            loop {
                if !self.reconnect().await {
                    self.stop().await;
                    return;
                }
                match self.sync().await {
                    SyncOutcome::Live => break,
                    SyncOutcome::Lost(reason) => self.enter_disconnected(reason).await,
                }
            }
            events = self.link.subscribe();
        }

        self.stop().await;
    }

    async fn run_live(&mut self, events: &mut BoxStream<'static, LinkItem>) -> LiveExit {
        loop {
            let deadline = self.state.pending.next_deadline();

            tokio::select! {
                item = events.next() => match item {
                    None => return LiveExit::Disconnected("event stream ended".to_string()),
                    Some(Ok(ChangeEvent::Disconnected { reason })) => {
                        return LiveExit::Disconnected(reason);
                    }
                    Some(Ok(event)) => {
                        if self.on_event(event).await {
                            return LiveExit::Resync;
                        }
                    }
                    Some(Err(e)) if e.is_connection() => return LiveExit::Disconnected(e.to_string()),
                    Some(Err(e)) => warn!("Dropping undecodable server message: {e}"),
                },
                message = self.inbox.recv() => match message {
                    None | Some(BridgeMessage::Shutdown) => return LiveExit::Shutdown,
                    Some(BridgeMessage::Control { intent, reply }) => self.on_control(intent, reply),
                    Some(BridgeMessage::Dispatched { kind, seq, outcome }) => {
                        self.on_dispatched(kind, seq, outcome);
                    }
                },
                () = sleep_until(deadline), if deadline.is_some() => self.on_deadline(),
            }
        }
    }

    /// Apply one change event. Returns `true` when a full resync is needed.
    async fn on_event(&mut self, event: ChangeEvent) -> bool {
        let applied = self.state.apply(&event);

        match applied {
            Applied::Ignored => return false,
            Applied::Resync => {
                info!("Topology changed under tracked client; resyncing");
                return true;
            }
            Applied::Unchanged => {}
            Applied::Changed(changed) => {
                debug!(revision = self.state.revision(), ?changed, "Projection changed");
                self.publish(changed).await;
            }
        }

        for kind in self.state.confirm_pending() {
            debug!(?kind, "Intent confirmed by server");
        }
        false
    }

    fn on_control(&mut self, intent: ControlIntent, reply: Reply) {
        debug!(%intent, "Control intent received");

        let targets = projector::to_targets(
            intent,
            self.state.client(),
            self.state.stream(),
            self.state.projection(),
        );
        let targets = match targets {
            Ok(targets) => targets,
            Err(e) => {
                debug!(%intent, "Refusing control intent: {e}");
                let _ = reply.send(Err(e));
                return;
            }
        };

        let deadline = Instant::now() + self.settings.intent_timeout;
        let mut reply = Some(reply);

        for target in targets {
            // Secondary targets (unmute after SetVolume) answer nobody.
            let reply = reply
                .take()
                .unwrap_or_else(|| tokio::sync::oneshot::channel().0);

            if let IntentTarget::Seek(command) = target {
                self.dispatch_seek(command, reply);
                continue;
            }

            match self.state.pending.submit(target, reply, deadline) {
                Some(dispatch) => self.dispatch(dispatch),
                None => debug!(%intent, "Coalesced into in-flight request"),
            }
        }
    }

    fn on_dispatched(&mut self, kind: IntentKind, seq: u64, outcome: Result<(), SnapcastError>) {
        let next = match outcome {
            Ok(()) => self.state.pending.acknowledge(kind, seq),
            Err(e) => {
                warn!(?kind, seq, "Control request failed: {e}");
                self.state.pending.reject(kind, seq, ControlError::from(e))
            }
        };

        if let Some(dispatch) = next {
            self.dispatch(dispatch);
        }
    }

    fn on_deadline(&mut self) {
        for kind in self.state.pending.expire(Instant::now()) {
            warn!(?kind, "Intent not confirmed before deadline; dropping");
        }
    }

    fn dispatch(&self, Dispatch { seq, target }: Dispatch) {
        let kind = target.kind();
        let link = Arc::clone(&self.link);
        let handle = self.handle.clone();
        let client_id = self.state.target().client_id().to_string();
        let stream_id = self.state.target().stream_id().to_string();
        let capabilities = self.state.stream().capabilities;

        debug!(?target, seq, "Dispatching request");
        tokio::spawn(async move {
            let outcome = match target {
                IntentTarget::Volume(level) => link.set_volume(&client_id, level).await,
                IntentTarget::Mute(muted) => link.set_mute(&client_id, muted).await,
                IntentTarget::Playback { command, .. }
                | IntentTarget::Track { command, .. }
                | IntentTarget::Seek(command) => {
                    link.send_playback_command(&stream_id, command, &capabilities)
                        .await
                }
            };
            handle.dispatched(kind, seq, outcome).await;
        });
    }

    fn dispatch_seek(&self, command: PlaybackCommand, reply: Reply) {
        let link = Arc::clone(&self.link);
        let stream_id = self.state.target().stream_id().to_string();
        let capabilities = self.state.stream().capabilities;

        tokio::spawn(async move {
            let outcome = link
                .send_playback_command(&stream_id, command, &capabilities)
                .await
                .map_err(ControlError::from);
            let _ = reply.send(outcome);
        });
    }

    async fn enter_disconnected(&mut self, reason: String) {
        warn!("Lost snapcast session: {reason}");
        self.phase.set(BridgePhase::Disconnected);
        self.state.pending.clear(&ControlError::Disconnected);

        if self.settings.degrade_on_disconnect {
            if let Applied::Changed(changed) = self.state.link_lost() {
                self.publish(changed).await;
            }
        }

        self.link.disconnect().await;
    }

    /// Wait out the backoff delay and try to connect. Returns `false` on shutdown.
    async fn reconnect(&mut self) -> bool {
        loop {
            let delay = self.settings.backoff.next_delay();
            info!("Reconnecting in {delay:?}");

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    () = &mut sleep => break,
                    message = self.inbox.recv() => match message {
                        None | Some(BridgeMessage::Shutdown) => return false,
                        Some(BridgeMessage::Control { reply, .. }) => {
                            let _ = reply.send(Err(ControlError::Disconnected));
                        }
                        Some(BridgeMessage::Dispatched { .. }) => {}
                    },
                }
            }

            match self.link.connect(&self.settings.address).await {
                Ok(()) => {
                    self.phase.set(BridgePhase::Syncing);
                    return true;
                }
                Err(e) => warn!("Reconnect failed: {e}"),
            }
        }
    }

    async fn sync(&mut self) -> SyncOutcome {
        let selector = self.state.target().selector().clone();

        match self.link.current_state(&selector).await {
            Ok(snapshot) => {
                let previous_stream = self.state.target().stream_id().to_string();
                let changed = self.state.resync(snapshot);

                if self.state.target().stream_id() != previous_stream {
                    info!(
                        from = %previous_stream,
                        to = %self.state.target().stream_id(),
                        "Tracked client now follows a different stream"
                    );
                    self.state.pending.drop_kinds(
                        &[IntentKind::Playback, IntentKind::Track],
                        &ControlError::StreamChanged,
                    );
                }

                self.publish(changed).await;
                self.state.confirm_pending();
                self.settings.backoff.reset();
                self.phase.set(BridgePhase::Live);
                info!(revision = self.state.revision(), "Resynchronized with server");
                SyncOutcome::Live
            }
            Err(SnapcastError::NotFound(client)) => {
                warn!("Tracked client '{client}' vanished from the server");
                if let Applied::Changed(changed) = self.state.client_vanished() {
                    self.publish(changed).await;
                }
                self.phase.set(BridgePhase::Live);
                SyncOutcome::Live
            }
            Err(e) => SyncOutcome::Lost(e.to_string()),
        }
    }

    async fn publish(&self, changed: ChangedProperties) {
        let update = Published {
            revision: self.state.revision(),
            projection: self.state.projection().clone(),
            changed,
        };
        self.sink.publish(&update).await;
    }

    async fn stop(&mut self) {
        info!("Stopping bridge");
        self.phase.set(BridgePhase::Stopped);
        self.state.pending.clear(&ControlError::ShuttingDown);
        self.link.disconnect().await;
        self.sink.close().await;
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}
