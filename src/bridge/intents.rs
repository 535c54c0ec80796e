//! Locally issued control actions awaiting server confirmation.
//!
//! The table holds at most one entry per [`IntentKind`]. Each entry has at
//! most one RPC in flight; a newer intent of the same kind replaces the
//! queued target instead of queuing another RPC, so a burst of volume
//! changes collapses into the most recent level.
//!
//! Every dispatched RPC carries a sequence number. Outcomes are only
//! credited to the entry whose in-flight number matches, so a request that
//! outlived its intent (expired, or cleared by a disconnect) cannot settle a
//! newer one.

use std::{collections::HashMap, fmt};

use tokio::{sync::oneshot, time::Instant};

use crate::services::snapcast::{ClientState, PlaybackCommand};

use super::{
    ControlError,
    projector::{PlaybackStatus, Projection},
};

/// Control action requested through the media-player interface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlIntent {
    /// Toggle between playing and paused
    PlayPause,
    /// Start playback
    Play,
    /// Pause playback
    Pause,
    /// Stop playback
    Stop,
    /// Skip to the next track
    Next,
    /// Skip to the previous track
    Previous,
    /// Set volume on the 0.0-1.0 scale
    SetVolume(f64),
    /// Seek relative to the current position, in microseconds
    Seek(i64),
}

impl fmt::Display for ControlIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayPause => write!(f, "PlayPause"),
            Self::Play => write!(f, "Play"),
            Self::Pause => write!(f, "Pause"),
            Self::Stop => write!(f, "Stop"),
            Self::Next => write!(f, "Next"),
            Self::Previous => write!(f, "Previous"),
            Self::SetVolume(volume) => write!(f, "SetVolume({volume})"),
            Self::Seek(offset) => write!(f, "Seek({offset})"),
        }
    }
}

/// Pending-intent slot an action occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    /// Client volume level
    Volume,
    /// Client mute flag
    Mute,
    /// Stream play/pause/stop state
    Playback,
    /// Stream track skip
    Track,
    /// Relative seek (never held pending)
    Seek,
}

/// Concrete request an intent resolves to, and the state that confirms it.
#[derive(Debug, Clone, PartialEq)]
pub enum IntentTarget {
    /// Set the client level; confirmed when the client reports it
    Volume(u8),

    /// Set the client mute flag; confirmed when the client reports it
    Mute(bool),

    /// Playback command; confirmed when the projected status matches
    Playback {
        /// Command to send
        command: PlaybackCommand,
        /// Status that confirms it
        expect: PlaybackStatus,
    },

    /// Skip command; confirmed once the track identifier moves away from `from`
    Track {
        /// `Next` or `Previous`
        command: PlaybackCommand,
        /// Track identifier at dispatch time
        from: String,
    },

    /// Relative seek; there is no position to confirm against
    Seek(PlaybackCommand),
}

impl IntentTarget {
    /// Pending slot this target occupies.
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::Volume(_) => IntentKind::Volume,
            Self::Mute(_) => IntentKind::Mute,
            Self::Playback { .. } => IntentKind::Playback,
            Self::Track { .. } => IntentKind::Track,
            Self::Seek(_) => IntentKind::Seek,
        }
    }

    /// Whether the observed state already reflects this target.
    pub fn is_satisfied_by(&self, client: &ClientState, projection: &Projection) -> bool {
        match self {
            Self::Volume(level) => client.volume == *level,
            Self::Mute(muted) => client.muted == *muted,
            Self::Playback { expect, .. } => projection.playback_status == *expect,
            Self::Track { from, .. } => projection.metadata.track_id != *from,
            Self::Seek(_) => true,
        }
    }
}

/// An RPC the coordinator must send, tagged with its sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Sequence number echoed back with the outcome
    pub seq: u64,
    /// Request to send
    pub target: IntentTarget,
}

/// Reply channel of a waiting control call.
pub type Reply = oneshot::Sender<Result<(), ControlError>>;

fn answer(reply: Option<Reply>, outcome: Result<(), ControlError>) {
    if let Some(reply) = reply {
        let _ = reply.send(outcome);
    }
}

#[derive(Debug)]
struct PendingIntent {
    /// Most recently requested target
    target: IntentTarget,
    /// Target of the RPC currently in flight
    in_flight: Option<IntentTarget>,
    in_flight_seq: u64,
    in_flight_reply: Option<Reply>,
    queued_reply: Option<Reply>,
    deadline: Instant,
}

impl PendingIntent {
    fn has_queued(&self) -> bool {
        self.in_flight.as_ref() != Some(&self.target)
    }
}

/// Pending-intent table, keyed by [`IntentKind`].
#[derive(Debug, Default)]
pub struct PendingIntents {
    entries: HashMap<IntentKind, PendingIntent>,
    next_seq: u64,
}

impl PendingIntents {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending intents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an intent of `kind` is pending.
    pub fn contains(&self, kind: IntentKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Latest requested target of `kind`.
    pub fn target(&self, kind: IntentKind) -> Option<&IntentTarget> {
        self.entries.get(&kind).map(|entry| &entry.target)
    }

    fn issue(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Earliest deadline among pending intents.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|entry| entry.deadline).min()
    }

    /// Record a new intent.
    ///
    /// Returns the request to dispatch now, or `None` when an RPC of the same
    /// kind is still in flight and the new target was queued behind it.
    pub fn submit(&mut self, target: IntentTarget, reply: Reply, deadline: Instant) -> Option<Dispatch> {
        let kind = target.kind();
        let seq = self.issue();

        match self.entries.get_mut(&kind) {
            Some(entry) if entry.in_flight.is_some() => {
                answer(entry.queued_reply.take(), Ok(()));
                entry.target = target;
                entry.queued_reply = Some(reply);
                entry.deadline = deadline;
                None
            }
            Some(entry) => {
                entry.target = target.clone();
                entry.in_flight = Some(target.clone());
                entry.in_flight_seq = seq;
                entry.in_flight_reply = Some(reply);
                entry.deadline = deadline;
                Some(Dispatch { seq, target })
            }
            None => {
                self.entries.insert(
                    kind,
                    PendingIntent {
                        target: target.clone(),
                        in_flight: Some(target.clone()),
                        in_flight_seq: seq,
                        in_flight_reply: Some(reply),
                        queued_reply: None,
                        deadline,
                    },
                );
                Some(Dispatch { seq, target })
            }
        }
    }

    fn in_flight_mut(&mut self, kind: IntentKind, seq: u64) -> Option<&mut PendingIntent> {
        self.entries
            .get_mut(&kind)
            .filter(|entry| entry.in_flight.is_some() && entry.in_flight_seq == seq)
    }

    fn promote_queued(&mut self, kind: IntentKind) -> Option<Dispatch> {
        let seq = self.issue();
        let entry = self.entries.get_mut(&kind)?;
        entry.in_flight = Some(entry.target.clone());
        entry.in_flight_seq = seq;
        entry.in_flight_reply = entry.queued_reply.take();
        Some(Dispatch {
            seq,
            target: entry.target.clone(),
        })
    }

    /// The RPC `seq` of `kind` was acknowledged.
    ///
    /// Outcomes of requests that are no longer in flight are ignored. Returns
    /// a queued request that must be dispatched next.
    pub fn acknowledge(&mut self, kind: IntentKind, seq: u64) -> Option<Dispatch> {
        let entry = self.in_flight_mut(kind, seq)?;
        answer(entry.in_flight_reply.take(), Ok(()));

        if entry.has_queued() {
            return self.promote_queued(kind);
        }

        entry.in_flight = None;
        answer(entry.queued_reply.take(), Ok(()));
        None
    }

    /// The RPC `seq` of `kind` failed.
    ///
    /// The caller that issued it gets the fault; stale outcomes are ignored.
    /// A queued request is returned for dispatch, otherwise the intent is
    /// dropped and state stays as it was.
    pub fn reject(&mut self, kind: IntentKind, seq: u64, error: ControlError) -> Option<Dispatch> {
        let entry = self.in_flight_mut(kind, seq)?;
        answer(entry.in_flight_reply.take(), Err(error));

        if entry.has_queued() && entry.queued_reply.is_some() {
            return self.promote_queued(kind);
        }

        self.entries.remove(&kind);
        None
    }

    /// Clear every intent the observed state confirms.
    ///
    /// Returns the confirmed kinds.
    pub fn confirm(&mut self, client: &ClientState, projection: &Projection) -> Vec<IntentKind> {
        let confirmed: Vec<IntentKind> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.target.is_satisfied_by(client, projection))
            .map(|(kind, _)| *kind)
            .collect();

        for kind in &confirmed {
            if let Some(mut entry) = self.entries.remove(kind) {
                answer(entry.in_flight_reply.take(), Ok(()));
                answer(entry.queued_reply.take(), Ok(()));
            }
        }

        confirmed
    }

    /// Drop every intent whose deadline has passed.
    ///
    /// Returns the expired kinds.
    pub fn expire(&mut self, now: Instant) -> Vec<IntentKind> {
        let expired: Vec<IntentKind> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(kind, _)| *kind)
            .collect();

        for kind in &expired {
            self.drop_kind(*kind, ControlError::TimedOut(*kind));
        }

        expired
    }

    /// Drop the intents of the given kinds, failing their callers with `error`.
    pub fn drop_kinds(&mut self, kinds: &[IntentKind], error: &ControlError) {
        for kind in kinds {
            self.drop_kind(*kind, error.clone());
        }
    }

    /// Drop every intent, failing all callers with `error`.
    pub fn clear(&mut self, error: &ControlError) {
        for (_, mut entry) in self.entries.drain() {
            answer(entry.in_flight_reply.take(), Err(error.clone()));
            answer(entry.queued_reply.take(), Err(error.clone()));
        }
    }

    fn drop_kind(&mut self, kind: IntentKind, error: ControlError) {
        if let Some(mut entry) = self.entries.remove(&kind) {
            answer(entry.in_flight_reply.take(), Err(error.clone()));
            answer(entry.queued_reply.take(), Err(error));
        }
    }
}
