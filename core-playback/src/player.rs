//! # Audio Player Contract
//!
//! One capability set shared by every streaming backend.
//!
//! ## Overview
//!
//! The controller drives playback exclusively through [`AudioPlayer`]; it
//! never knows which transport sits underneath. Each backend owns a
//! `PlayerCore` that serializes state mutation and publishes transitions,
//! so the observable behavior (state order, stall/recovery events, idempotent
//! play/stop) is identical across backends.
//!
//! ## Streams
//!
//! `state_stream`, `event_stream` and `audio_buffer_stream` subscribe at call
//! time: a new subscriber observes transitions from "now" and nothing that
//! happened earlier. Transitions are published while the state lock is held,
//! so every subscriber sees them in the order they occurred.

use crate::analytics::Analytics;
use bridge_traits::{AudioFrameChunk, PlayerType, TransportEvent, TransportEventReceiver};
use futures::stream::{BoxStream, StreamExt};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{trace, warn};

/// Capacity of the state and event broadcast channels.
const CHANNEL_CAPACITY: usize = 64;

/// Transport-facing playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    #[default]
    Idle,
    /// Connecting or buffering; not yet audible.
    Loading,
    Playing,
    /// Underrun while playing.
    Stalled,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
            PlaybackState::Stalled => "stalled",
        }
    }
}

/// Stall/recovery notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerEvent {
    /// Underrun detected while playing.
    Stall,
    /// Back to playing after a stall.
    Recovery,
}

/// Playback capability implemented once per transport.
///
/// All methods return immediately. Effects such as reaching
/// [`PlaybackState::Playing`] complete asynchronously; observe them through
/// [`state_stream`](AudioPlayer::state_stream).
pub trait AudioPlayer: Send + Sync {
    fn player_type(&self) -> PlayerType;

    /// Start playback.
    ///
    /// Idempotent: while loading or playing this only records an
    /// "already playing" marker. From idle or stalled it opens a fresh
    /// live connection.
    fn play(&self);

    /// Stop playback and release the current live connection.
    ///
    /// Idempotent and never records analytics; callers that need a
    /// `Stopped` event capture it before calling.
    fn stop(&self);

    fn state(&self) -> PlaybackState;

    fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// State transitions from now on.
    fn state_stream(&self) -> BoxStream<'static, PlaybackState>;

    /// Stall/recovery events from now on.
    fn event_stream(&self) -> BoxStream<'static, PlayerEvent>;

    /// Raw decoded audio, when the backend has buffer-level access.
    ///
    /// Backends without it return a stream that is already finished.
    /// An empty stream is a valid outcome, not an error.
    fn audio_buffer_stream(&self) -> BoxStream<'static, AudioFrameChunk>;

    /// Enable the audio-processing hook. Redundant calls are no-ops.
    fn install_render_tap(&self);

    /// Disable the audio-processing hook. Redundant calls are no-ops.
    fn remove_render_tap(&self);

    fn is_render_tap_installed(&self) -> bool;
}

/// Mutable state shared by both backends, guarded by [`PlayerCore`].
#[derive(Debug, Default)]
pub(crate) struct CoreState {
    pub state: PlaybackState,
    pub play_started_at: Option<Instant>,
    pub stall_started_at: Option<Instant>,
    /// Set when a play() restarts a stalled stream, so reaching playing
    /// reports a recovery.
    pub recovering: bool,
}

impl CoreState {
    pub fn session_duration(&self) -> Duration {
        self.play_started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    pub fn stall_duration(&self) -> Option<Duration> {
        self.stall_started_at.map(|started| started.elapsed())
    }

    fn reset_timing(&mut self) {
        self.play_started_at = None;
        self.stall_started_at = None;
        self.recovering = false;
    }
}

/// Serialized state cell plus the broadcast channels observers subscribe to.
pub(crate) struct PlayerCore {
    player_type: PlayerType,
    state: Mutex<CoreState>,
    state_tx: broadcast::Sender<PlaybackState>,
    event_tx: broadcast::Sender<PlayerEvent>,
    analytics: Analytics,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl PlayerCore {
    pub fn new(player_type: PlayerType, analytics: Analytics) -> Self {
        let (state_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (event_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            player_type,
            state: Mutex::new(CoreState::default()),
            state_tx,
            event_tx,
            analytics,
            pump: Mutex::new(None),
        }
    }

    pub fn player_type(&self) -> PlayerType {
        self.player_type
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    pub fn lock(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock()
    }

    pub fn state(&self) -> PlaybackState {
        self.state.lock().state
    }

    /// Move to `next` and publish it. Must be called with the lock held.
    pub fn transition(&self, guard: &mut CoreState, next: PlaybackState) {
        if guard.state == next {
            return;
        }
        trace!(
            player_type = self.player_type.as_str(),
            from = guard.state.as_str(),
            to = next.as_str(),
            "Player state transition"
        );
        guard.state = next;
        if next == PlaybackState::Idle {
            guard.reset_timing();
        }
        // No subscribers is fine.
        let _ = self.state_tx.send(next);
    }

    /// Enter `Stalled` from `Playing`; anything else is ignored.
    pub fn enter_stall(&self, guard: &mut CoreState) -> bool {
        if guard.state != PlaybackState::Playing {
            trace!(
                player_type = self.player_type.as_str(),
                state = guard.state.as_str(),
                "Ignoring stall outside of playing"
            );
            return false;
        }
        guard.stall_started_at = Some(Instant::now());
        self.transition(guard, PlaybackState::Stalled);
        self.emit(PlayerEvent::Stall);
        true
    }

    /// Enter `Playing`, reporting a recovery when coming back from a stall.
    ///
    /// Returns the stall duration when this was a recovery.
    pub fn enter_playing(&self, guard: &mut CoreState) -> Option<Duration> {
        let recovered = guard.recovering || guard.state == PlaybackState::Stalled;
        let stall_duration = guard.stall_duration();
        self.transition(guard, PlaybackState::Playing);
        guard.recovering = false;
        guard.stall_started_at = None;
        if recovered {
            self.emit(PlayerEvent::Recovery);
            Some(stall_duration.unwrap_or_default())
        } else {
            None
        }
    }

    pub fn emit(&self, event: PlayerEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn state_stream(&self) -> BoxStream<'static, PlaybackState> {
        broadcast_stream(self.state_tx.subscribe())
    }

    pub fn event_stream(&self) -> BoxStream<'static, PlayerEvent> {
        broadcast_stream(self.event_tx.subscribe())
    }

    pub fn set_pump(&self, handle: JoinHandle<()>) {
        if let Some(previous) = self.pump.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl Drop for PlayerCore {
    fn drop(&mut self) {
        if let Some(handle) = self.pump.get_mut().take() {
            handle.abort();
        }
    }
}

/// Implemented by backends that consume transport callbacks.
///
/// Events normally arrive through the pump task spawned at construction.
/// Calling this directly applies an event synchronously, which hosts that
/// already run on a serialized context (and tests) can use.
pub trait TransportEventHandler: Send + Sync + 'static {
    fn handle_transport_event(&self, event: TransportEvent);
}

/// Apply transport events to `player` in arrival order on one task.
///
/// The task holds only a weak reference, so it never keeps the player alive.
pub(crate) fn spawn_transport_pump<P>(
    player: &Arc<P>,
    mut events: TransportEventReceiver,
) -> JoinHandle<()>
where
    P: TransportEventHandler,
{
    let weak: Weak<P> = Arc::downgrade(player);
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(player) = weak.upgrade() else {
                break;
            };
            player.handle_transport_event(event);
        }
    })
}

/// Turn a broadcast receiver into a stream, skipping over lag.
pub(crate) fn broadcast_stream<T>(receiver: broadcast::Receiver<T>) -> BoxStream<'static, T>
where
    T: Clone + Send + 'static,
{
    futures::stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(value) => return Some((value, receiver)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Player stream subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}
