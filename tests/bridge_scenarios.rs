//! Coordinator behavior against an in-memory link, on a paused clock.

#![allow(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod common;

use std::{sync::Arc, time::Duration};

use common::{ADDRESS, Call, FakeLink, RecordingSink, kitchen, settings, settle};
use snapcast_mpris::{
    bridge::{
        self, BridgeHandle, BridgePhase, BridgeState, ChangedProperties, ControlError,
        ControlIntent, Coordinator, PlaybackStatus, Published,
    },
    services::{
        common::Property,
        mpris::changed_values,
        snapcast::{ChangeEvent, ClientSelector, PlaybackCommand, Snapshot, SnapcastError, StreamStatus},
    },
};
use tokio::task::JoinHandle;
use zbus::zvariant::Value;

const CLIENT: &str = "00:11:22:33:44:55";

struct Harness {
    link: Arc<FakeLink>,
    sink: Arc<RecordingSink>,
    handle: BridgeHandle,
    phase: Property<BridgePhase>,
    initial: Published,
    task: JoinHandle<()>,
}

impl Harness {
    async fn start(snapshot: Snapshot, degrade_on_disconnect: bool) -> Self {
        let link = Arc::new(FakeLink::new(snapshot));
        let selector = ClientSelector::new("Kitchen");
        let mut settings = settings(degrade_on_disconnect);

        let snapshot = bridge::bootstrap(link.as_ref(), ADDRESS, &selector, &mut settings.backoff)
            .await
            .unwrap();
        let state = BridgeState::new(selector, snapshot);
        let sink = Arc::new(RecordingSink::default());
        let (handle, inbox) = BridgeHandle::channel();

        let coordinator = Coordinator::new(
            Arc::clone(&link),
            Arc::clone(&sink),
            (handle.clone(), inbox),
            settings,
            state,
        );
        let initial = coordinator.published();
        let phase = coordinator.phase();
        let task = tokio::spawn(coordinator.run());
        phase.wait_for(|p| *p == BridgePhase::Live).await;

        Self {
            link,
            sink,
            handle,
            phase,
            initial,
            task,
        }
    }

    fn control(&self, intent: ControlIntent) -> JoinHandle<Result<(), ControlError>> {
        let handle = self.handle.clone();
        tokio::spawn(async move { handle.control(intent).await })
    }

    fn volume_changed(&self, level: u8) {
        self.link.push(ChangeEvent::ClientVolumeChanged {
            client_id: CLIENT.into(),
            level,
        });
    }
}

#[tokio::test(start_paused = true)]
async fn initial_fetch_projects_exact_properties() {
    let harness = Harness::start(kitchen(), true).await;
    let initial = &harness.initial;

    assert_eq!(initial.revision, 1);
    assert_eq!(initial.projection.volume, 0.4);
    assert_eq!(initial.projection.playback_status, PlaybackStatus::Playing);
    assert_eq!(initial.projection.metadata.title.as_deref(), Some("X"));

    let values = changed_values(initial);
    assert_eq!(values.get("Volume"), Some(&Value::from(0.4)));
    assert_eq!(values.get("PlaybackStatus"), Some(&Value::from("Playing")));
    assert_eq!(harness.sink.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn set_volume_is_confirmed_by_server_event() {
    let harness = Harness::start(kitchen(), true).await;

    let call = harness.control(ControlIntent::SetVolume(0.8));
    settle().await;

    assert_eq!(harness.link.calls(), vec![Call::SetVolume(CLIENT.into(), 80)]);
    assert_eq!(call.await.unwrap(), Ok(()));
    assert_eq!(harness.sink.count(), 0);

    harness.volume_changed(80);
    settle().await;

    let published = harness.sink.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].changed, ChangedProperties::VOLUME);
    assert_eq!(published[0].projection.volume, 0.8);

    harness.volume_changed(80);
    settle().await;

    assert_eq!(harness.sink.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn disconnect_emits_nothing_until_resynced() {
    let harness = Harness::start(kitchen(), false).await;
    harness.link.script_connects([
        Err(SnapcastError::Connection("refused".into())),
        Err(SnapcastError::Connection("refused".into())),
    ]);

    harness.link.drop_session();
    settle().await;

    assert_eq!(harness.phase.get(), BridgePhase::Disconnected);
    assert_eq!(harness.sink.count(), 0);
    assert_eq!(
        harness.control(ControlIntent::Pause).await.unwrap(),
        Err(ControlError::Disconnected)
    );

    tokio::time::sleep(Duration::from_millis(1_200)).await;
    assert_eq!(harness.phase.get(), BridgePhase::Disconnected);
    assert_eq!(harness.sink.count(), 0);

    harness.phase.wait_for(|p| *p == BridgePhase::Live).await;

    assert_eq!(harness.link.connects(), 4);
    let published = harness.sink.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].changed, ChangedProperties::all());
    assert_eq!(published[0].revision, 2);
}

#[tokio::test(start_paused = true)]
async fn disconnect_publishes_one_degraded_status() {
    let harness = Harness::start(kitchen(), true).await;

    harness.link.drop_session();
    settle().await;

    let degraded = harness.sink.last().unwrap();
    assert_eq!(harness.sink.count(), 1);
    assert_eq!(degraded.changed, ChangedProperties::PLAYBACK_STATUS);
    assert_eq!(degraded.projection.playback_status, PlaybackStatus::Stopped);

    harness.phase.wait_for(|p| *p == BridgePhase::Live).await;

    let restored = harness.sink.last().unwrap();
    assert_eq!(harness.sink.count(), 2);
    assert_eq!(restored.changed, ChangedProperties::all());
    assert_eq!(restored.projection.playback_status, PlaybackStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn seek_without_capability_is_refused_locally() {
    let mut snapshot = kitchen();
    snapshot.stream.capabilities.can_seek = false;
    let harness = Harness::start(snapshot, true).await;

    let result = harness.control(ControlIntent::Seek(5_000_000)).await.unwrap();

    assert!(matches!(result, Err(ControlError::Unsupported(_))));
    assert!(harness.link.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn seek_is_forwarded_when_supported() {
    let harness = Harness::start(kitchen(), true).await;

    let result = harness.control(ControlIntent::Seek(-2_000_000)).await.unwrap();

    assert_eq!(result, Ok(()));
    assert_eq!(
        harness.link.calls(),
        vec![Call::Playback(
            "Spotify".into(),
            PlaybackCommand::Seek {
                offset_us: -2_000_000
            }
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn group_reassignment_forces_full_refresh() {
    let harness = Harness::start(kitchen(), true).await;
    let mut moved = kitchen();
    moved.stream_id = "Radio".into();
    harness.link.set_snapshot(Ok(moved));

    harness.link.push(ChangeEvent::GroupStreamReassigned {
        group_id: "g1".into(),
        stream_id: "Radio".into(),
    });
    settle().await;

    let refresh = harness.sink.last().unwrap();
    assert_eq!(harness.sink.count(), 1);
    assert_eq!(refresh.changed, ChangedProperties::all());
    assert_eq!(refresh.revision, 2);
    assert_eq!(harness.phase.get(), BridgePhase::Live);

    harness.link.push(ChangeEvent::StreamStatusChanged {
        stream_id: "Spotify".into(),
        status: StreamStatus::Paused,
    });
    settle().await;
    assert_eq!(harness.sink.count(), 1);

    harness.link.push(ChangeEvent::StreamStatusChanged {
        stream_id: "Radio".into(),
        status: StreamStatus::Paused,
    });
    settle().await;

    let paused = harness.sink.last().unwrap();
    assert_eq!(harness.sink.count(), 2);
    assert_eq!(paused.changed, ChangedProperties::PLAYBACK_STATUS);
    assert_eq!(paused.projection.playback_status, PlaybackStatus::Paused);
}

#[tokio::test(start_paused = true)]
async fn topology_push_republishes_even_when_unchanged() {
    let harness = Harness::start(kitchen(), true).await;

    harness.link.push(ChangeEvent::TopologyChanged);
    settle().await;

    let refresh = harness.sink.last().unwrap();
    assert_eq!(refresh.changed, ChangedProperties::all());
    assert_eq!(refresh.projection, harness.initial.projection);
    assert_eq!(refresh.revision, 2);
}

#[tokio::test(start_paused = true)]
async fn unconfirmed_intent_expires_without_side_effects() {
    let harness = Harness::start(kitchen(), true).await;

    assert_eq!(
        harness.control(ControlIntent::SetVolume(0.8)).await.unwrap(),
        Ok(())
    );
    tokio::time::sleep(Duration::from_secs(4)).await;

    assert_eq!(harness.sink.count(), 0);

    harness.volume_changed(40);
    settle().await;
    assert_eq!(harness.sink.count(), 0);

    harness.volume_changed(55);
    settle().await;
    assert_eq!(harness.sink.last().unwrap().projection.volume, 0.55);

    assert_eq!(
        harness.control(ControlIntent::SetVolume(0.8)).await.unwrap(),
        Ok(())
    );
    assert_eq!(
        harness.link.calls(),
        vec![
            Call::SetVolume(CLIENT.into(), 80),
            Call::SetVolume(CLIENT.into(), 80)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn rapid_volume_changes_coalesce() {
    let harness = Harness::start(kitchen(), true).await;
    harness.link.hold_requests();

    let first = harness.control(ControlIntent::SetVolume(0.5));
    settle().await;
    let second = harness.control(ControlIntent::SetVolume(0.6));
    settle().await;
    let third = harness.control(ControlIntent::SetVolume(0.7));
    settle().await;

    assert_eq!(harness.link.calls(), vec![Call::SetVolume(CLIENT.into(), 50)]);
    assert_eq!(second.await.unwrap(), Ok(()));

    harness.link.release(10);
    settle().await;

    assert_eq!(first.await.unwrap(), Ok(()));
    assert_eq!(third.await.unwrap(), Ok(()));
    assert_eq!(
        harness.link.calls(),
        vec![
            Call::SetVolume(CLIENT.into(), 50),
            Call::SetVolume(CLIENT.into(), 70)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn late_outcome_of_expired_request_is_not_credited_to_successor() {
    let harness = Harness::start(kitchen(), true).await;
    harness.link.hold_requests();

    let first = harness.control(ControlIntent::SetVolume(0.5));
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(
        first.await.unwrap(),
        Err(ControlError::TimedOut(bridge::IntentKind::Volume))
    );

    let second = harness.control(ControlIntent::SetVolume(0.6));
    settle().await;
    assert_eq!(
        harness.link.calls(),
        vec![
            Call::SetVolume(CLIENT.into(), 50),
            Call::SetVolume(CLIENT.into(), 60)
        ]
    );

    harness.link.fail_next_request(SnapcastError::Request {
        method: "Client.SetVolume".into(),
        reason: "old request failed".into(),
    });
    harness.link.release(1);
    settle().await;
    assert!(!second.is_finished());

    // Still in flight, so a newer level queues behind it.
    let third = harness.control(ControlIntent::SetVolume(0.7));
    settle().await;
    assert_eq!(harness.link.calls().len(), 2);

    harness.link.release(10);
    settle().await;

    assert_eq!(second.await.unwrap(), Ok(()));
    assert_eq!(third.await.unwrap(), Ok(()));
    assert_eq!(
        harness.link.calls().last(),
        Some(&Call::SetVolume(CLIENT.into(), 70))
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_request_reaches_caller() {
    let harness = Harness::start(kitchen(), true).await;
    harness.link.fail_next_request(SnapcastError::Request {
        method: "Stream.Control".into(),
        reason: "player unavailable".into(),
    });

    let result = harness.control(ControlIntent::Pause).await.unwrap();

    assert!(matches!(result, Err(ControlError::Rejected(_))));
    assert_eq!(harness.sink.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn raising_volume_of_muted_client_unmutes() {
    let mut snapshot = kitchen();
    snapshot.client.muted = true;
    let harness = Harness::start(snapshot, true).await;
    assert_eq!(harness.initial.projection.volume, 0.0);

    assert_eq!(
        harness.control(ControlIntent::SetVolume(0.5)).await.unwrap(),
        Ok(())
    );
    settle().await;

    let calls = harness.link.calls();
    assert!(calls.contains(&Call::SetVolume(CLIENT.into(), 50)));
    assert!(calls.contains(&Call::SetMute(CLIENT.into(), false)));
}

#[tokio::test(start_paused = true)]
async fn malformed_messages_do_not_stop_the_loop() {
    let harness = Harness::start(kitchen(), true).await;

    harness
        .link
        .push_error(SnapcastError::Protocol("unexpected token".into()));
    harness.volume_changed(70);
    settle().await;

    assert_eq!(harness.phase.get(), BridgePhase::Live);
    assert_eq!(harness.sink.last().unwrap().projection.volume, 0.7);
}

#[tokio::test(start_paused = true)]
async fn vanished_client_keeps_bridge_live() {
    let harness = Harness::start(kitchen(), true).await;
    harness
        .link
        .set_snapshot(Err(SnapcastError::NotFound("Kitchen".into())));

    harness.link.push(ChangeEvent::TopologyChanged);
    settle().await;

    assert_eq!(harness.phase.get(), BridgePhase::Live);
    let offline = harness.sink.last().unwrap();
    assert_eq!(harness.sink.count(), 1);
    assert_eq!(offline.projection.playback_status, PlaybackStatus::Stopped);

    harness.volume_changed(10);
    settle().await;
    assert_eq!(harness.sink.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn reconnect_without_client_does_not_restore_stale_playback() {
    let harness = Harness::start(kitchen(), true).await;
    harness
        .link
        .set_snapshot(Err(SnapcastError::NotFound("Kitchen".into())));

    harness.link.drop_session();
    settle().await;
    assert_eq!(harness.phase.get(), BridgePhase::Disconnected);
    harness.phase.wait_for(|p| *p == BridgePhase::Live).await;
    settle().await;

    let statuses: Vec<PlaybackStatus> = harness
        .sink
        .published()
        .iter()
        .map(|p| p.projection.playback_status)
        .collect();
    assert_eq!(statuses, vec![PlaybackStatus::Stopped]);

    harness.link.push(ChangeEvent::StreamStatusChanged {
        stream_id: "Spotify".into(),
        status: StreamStatus::Playing,
    });
    settle().await;
    assert_eq!(
        harness.sink.last().unwrap().projection.playback_status,
        PlaybackStatus::Stopped
    );

    harness.link.set_snapshot(Ok(kitchen()));
    harness.link.push(ChangeEvent::ClientConnectivityChanged {
        client_id: CLIENT.into(),
        connected: true,
    });
    settle().await;

    let restored = harness.sink.last().unwrap();
    assert_eq!(restored.changed, ChangedProperties::all());
    assert_eq!(restored.projection.playback_status, PlaybackStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn revisions_strictly_increase_across_updates() {
    let harness = Harness::start(kitchen(), true).await;

    for level in [10, 10, 20, 30, 30] {
        harness.volume_changed(level);
    }
    harness.link.push(ChangeEvent::StreamStatusChanged {
        stream_id: "Spotify".into(),
        status: StreamStatus::Paused,
    });
    settle().await;

    let revisions: Vec<u64> = harness.sink.published().iter().map(|p| p.revision).collect();
    assert_eq!(revisions, vec![2, 3, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_sink_and_link() {
    let harness = Harness::start(kitchen(), true).await;

    harness.handle.shutdown().await;
    harness.task.await.unwrap();

    assert_eq!(harness.phase.get(), BridgePhase::Stopped);
    assert!(harness.sink.is_closed());
    assert!(harness.link.disconnects() >= 1);
    assert_eq!(
        harness.handle.control(ControlIntent::Play).await,
        Err(ControlError::ShuttingDown)
    );
}

#[tokio::test(start_paused = true)]
async fn bootstrap_fails_fast_on_unknown_client() {
    let link = FakeLink::new(kitchen());
    link.set_snapshot(Err(SnapcastError::NotFound("Attic".into())));
    let mut backoff = settings(true).backoff;

    let result = bridge::bootstrap(&link, ADDRESS, &ClientSelector::new("Attic"), &mut backoff).await;

    assert_eq!(result, Err(SnapcastError::NotFound("Attic".into())));
    assert_eq!(link.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn bootstrap_retries_until_server_answers() {
    let link = FakeLink::new(kitchen());
    link.script_connects([
        Err(SnapcastError::Connection("refused".into())),
        Err(SnapcastError::Connection("refused".into())),
    ]);
    let mut backoff = settings(true).backoff;

    let snapshot = bridge::bootstrap(&link, ADDRESS, &ClientSelector::new("Kitchen"), &mut backoff)
        .await
        .unwrap();

    assert_eq!(snapshot.client_id, CLIENT);
    assert_eq!(link.connects(), 3);
}
