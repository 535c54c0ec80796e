//! In-memory link and recording sink for driving the coordinator.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::stream::BoxStream;
use snapcast_mpris::{
    bridge::{Backoff, CoordinatorSettings, PropertySink, Published},
    services::snapcast::{
        ChangeEvent, ClientSelector, ClientState, LinkItem, PlaybackCommand, Snapshot,
        SnapcastError, SnapcastLink, StreamCapabilities, StreamState, StreamStatus,
        TrackMetadata,
    },
};
use tokio::sync::{Semaphore, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// A request the coordinator sent through the link.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetVolume(String, u8),
    SetMute(String, bool),
    Playback(String, PlaybackCommand),
}

/// Scripted [`SnapcastLink`].
pub struct FakeLink {
    snapshot: Mutex<Result<Snapshot, SnapcastError>>,
    connect_results: Mutex<VecDeque<Result<(), SnapcastError>>>,
    request_error: Mutex<Option<SnapcastError>>,
    sender: Mutex<Option<mpsc::UnboundedSender<LinkItem>>>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<LinkItem>>>,
    calls: Mutex<Vec<Call>>,
    gate: Semaphore,
    gated: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl FakeLink {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Ok(snapshot)),
            connect_results: Mutex::new(VecDeque::new()),
            request_error: Mutex::new(None),
            sender: Mutex::new(None),
            receiver: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            gate: Semaphore::new(0),
            gated: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn set_snapshot(&self, snapshot: Result<Snapshot, SnapcastError>) {
        *self.snapshot.lock().unwrap() = snapshot;
    }

    /// Results for upcoming `connect` calls; `Ok` once exhausted.
    pub fn script_connects(&self, results: impl IntoIterator<Item = Result<(), SnapcastError>>) {
        self.connect_results.lock().unwrap().extend(results);
    }

    /// Make the next request fail with `error`.
    pub fn fail_next_request(&self, error: SnapcastError) {
        *self.request_error.lock().unwrap() = Some(error);
    }

    /// Hold every request until `release` is called.
    pub fn hold_requests(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    /// Deliver an event on the current session.
    pub fn push(&self, event: ChangeEvent) {
        if let Some(sender) = self.sender.lock().unwrap().as_ref() {
            let _ = sender.send(Ok(event));
        }
    }

    /// Deliver an undecodable message on the current session.
    pub fn push_error(&self, error: SnapcastError) {
        if let Some(sender) = self.sender.lock().unwrap().as_ref() {
            let _ = sender.send(Err(error));
        }
    }

    /// End the current session the way a dropped socket does.
    pub fn drop_session(&self) {
        if let Some(sender) = self.sender.lock().unwrap().take() {
            let _ = sender.send(Ok(ChangeEvent::Disconnected {
                reason: "connection reset".to_string(),
            }));
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    async fn request(&self, call: Call) -> Result<(), SnapcastError> {
        self.calls.lock().unwrap().push(call);

        if self.gated.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }

        match self.request_error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SnapcastLink for FakeLink {
    async fn connect(&self, _address: &str) -> Result<(), SnapcastError> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let result = self.connect_results.lock().unwrap().pop_front();
        if let Some(Err(error)) = result {
            return Err(error);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock().unwrap() = Some(tx);
        *self.receiver.lock().unwrap() = Some(rx);
        Ok(())
    }

    async fn current_state(&self, _target: &ClientSelector) -> Result<Snapshot, SnapcastError> {
        self.snapshot.lock().unwrap().clone()
    }

    fn subscribe(&self) -> BoxStream<'static, LinkItem> {
        match self.receiver.lock().unwrap().take() {
            Some(rx) => Box::pin(UnboundedReceiverStream::new(rx)),
            None => Box::pin(futures::stream::iter([Ok(ChangeEvent::Disconnected {
                reason: "not connected".to_string(),
            })])),
        }
    }

    async fn set_volume(&self, client_id: &str, level: u8) -> Result<(), SnapcastError> {
        self.request(Call::SetVolume(client_id.to_string(), level))
            .await
    }

    async fn set_mute(&self, client_id: &str, muted: bool) -> Result<(), SnapcastError> {
        self.request(Call::SetMute(client_id.to_string(), muted))
            .await
    }

    async fn send_playback_command(
        &self,
        stream_id: &str,
        command: PlaybackCommand,
        capabilities: &StreamCapabilities,
    ) -> Result<(), SnapcastError> {
        if !command.is_allowed_by(capabilities) {
            return Err(SnapcastError::Unsupported {
                stream_id: stream_id.to_string(),
                command,
            });
        }
        self.request(Call::Playback(stream_id.to_string(), command))
            .await
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.sender.lock().unwrap().take();
    }
}

/// [`PropertySink`] that keeps every update.
#[derive(Default)]
pub struct RecordingSink {
    published: Mutex<Vec<Published>>,
    closed: AtomicBool,
}

impl RecordingSink {
    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Published> {
        self.published.lock().unwrap().last().cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PropertySink for RecordingSink {
    async fn publish(&self, update: &Published) {
        self.published.lock().unwrap().push(update.clone());
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub const ADDRESS: &str = "127.0.0.1:1705";

/// Kitchen client at 40 %, playing "X" with full controls.
pub fn kitchen() -> Snapshot {
    Snapshot {
        client_id: "00:11:22:33:44:55".into(),
        group_id: "g1".into(),
        stream_id: "Spotify".into(),
        client: ClientState {
            volume: 40,
            muted: false,
            connected: true,
        },
        stream: StreamState {
            status: StreamStatus::Playing,
            metadata: TrackMetadata {
                title: Some("X".into()),
                artists: vec!["Artist".into()],
                ..Default::default()
            },
            capabilities: StreamCapabilities {
                can_play: true,
                can_pause: true,
                can_seek: true,
                can_go_next: true,
                can_go_previous: true,
                can_control: true,
            },
        },
    }
}

pub fn settings(degrade_on_disconnect: bool) -> CoordinatorSettings {
    CoordinatorSettings {
        address: ADDRESS.to_string(),
        intent_timeout: Duration::from_secs(3),
        backoff: Backoff::new(Duration::from_millis(500), Duration::from_secs(30), 0.0),
        degrade_on_disconnect,
    }
}

/// Let every ready task run. Relies on the paused clock auto-advancing only
/// once the runtime is idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
