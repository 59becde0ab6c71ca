//! Shared fakes for playback integration tests.

#![allow(dead_code)]

use bridge_traits::{
    AnalyticsEvent, AnalyticsSink, AudioFrameChunk, BridgeError, EngineTransport, PlayerType,
    StreamErrorType, StreamTransport, TransportEvent, TransportEventSender,
};
use core_playback::{AudioPlayer, PlaybackState, PlayerEvent};
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const STREAM_URL: &str = "https://radio.example.com/live.mp3";

// ============================================================================
// Analytics
// ============================================================================

#[derive(Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalytics {
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().clone()
    }

    pub fn started_reasons(&self) -> Vec<Option<String>> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                AnalyticsEvent::Started { reason } => Some(reason),
                _ => None,
            })
            .collect()
    }

    pub fn stopped_reasons(&self) -> Vec<Option<String>> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                AnalyticsEvent::Stopped { reason, .. } => Some(reason),
                _ => None,
            })
            .collect()
    }

    pub fn stream_errors(&self) -> Vec<(StreamErrorType, u32)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                AnalyticsEvent::StreamError {
                    error_type,
                    reconnect_attempts,
                    ..
                } => Some((error_type, reconnect_attempts)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn capture(&self, event: AnalyticsEvent) {
        self.events.lock().push(event);
    }
}

// ============================================================================
// Transports
// ============================================================================

/// Engine transport that records calls and lets tests post events.
#[derive(Default)]
pub struct FakeEngineTransport {
    sender: Mutex<Option<TransportEventSender>>,
    pub loads: AtomicUsize,
    pub unloads: AtomicUsize,
    pub taps_installed: AtomicUsize,
    pub taps_removed: AtomicUsize,
}

impl FakeEngineTransport {
    pub fn emit(&self, event: TransportEvent) {
        if let Some(sender) = self.sender.lock().as_ref() {
            sender.send(event);
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn unloads(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }
}

impl EngineTransport for FakeEngineTransport {
    fn attach(&self, events: TransportEventSender) {
        *self.sender.lock() = Some(events);
    }

    fn load(&self, _url: &str) {
        self.loads.fetch_add(1, Ordering::SeqCst);
    }

    fn play(&self) {}

    fn pause(&self) {}

    fn unload(&self) {
        self.unloads.fetch_add(1, Ordering::SeqCst);
    }

    fn install_tap(&self) -> bridge_traits::error::Result<()> {
        self.taps_installed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove_tap(&self) {
        self.taps_removed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Stream transport that records calls and lets tests post events.
#[derive(Default)]
pub struct FakeStreamTransport {
    sender: Mutex<Option<TransportEventSender>>,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl FakeStreamTransport {
    pub fn emit(&self, event: TransportEvent) {
        if let Some(sender) = self.sender.lock().as_ref() {
            sender.send(event);
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl StreamTransport for FakeStreamTransport {
    fn attach(&self, events: TransportEventSender) {
        *self.sender.lock() = Some(events);
    }

    fn connect(&self, _url: &str) {
        self.connects.fetch_add(1, Ordering::SeqCst);
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn frames(count: usize) -> TransportEvent {
    TransportEvent::Frames(AudioFrameChunk::silence(count, 2, Duration::ZERO))
}

// ============================================================================
// Scripted player
// ============================================================================

/// Player whose state is driven by the test.
///
/// `play()` moves to loading; tests decide when (and whether) it reaches
/// playing.
pub struct MockPlayer {
    state: Mutex<PlaybackState>,
    state_tx: broadcast::Sender<PlaybackState>,
    event_tx: broadcast::Sender<PlayerEvent>,
    tap: AtomicBool,
    auto_confirm: AtomicBool,
    pub plays: AtomicUsize,
    pub stops: AtomicUsize,
    pub tap_installs: AtomicUsize,
    pub tap_removals: AtomicUsize,
}

impl MockPlayer {
    pub fn new() -> Arc<Self> {
        let (state_tx, _) = broadcast::channel(64);
        let (event_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            state: Mutex::new(PlaybackState::Idle),
            state_tx,
            event_tx,
            tap: AtomicBool::new(false),
            auto_confirm: AtomicBool::new(false),
            plays: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            tap_installs: AtomicUsize::new(0),
            tap_removals: AtomicUsize::new(0),
        })
    }

    /// Make every `play()` reach playing immediately.
    pub fn confirm_plays(&self, enabled: bool) {
        self.auto_confirm.store(enabled, Ordering::SeqCst);
    }

    pub fn set_state(&self, next: PlaybackState) {
        let mut state = self.state.lock();
        if *state != next {
            *state = next;
            let _ = self.state_tx.send(next);
        }
    }

    /// Playing -> stalled, with a stall event.
    pub fn trigger_stall(&self) {
        let mut state = self.state.lock();
        if *state != PlaybackState::Playing {
            return;
        }
        *state = PlaybackState::Stalled;
        let _ = self.state_tx.send(PlaybackState::Stalled);
        let _ = self.event_tx.send(PlayerEvent::Stall);
    }

    /// Publish a state notification without changing the current state.
    pub fn announce_state(&self, state: PlaybackState) {
        let _ = self.state_tx.send(state);
    }

    /// Publish a player event without changing the current state.
    pub fn announce_event(&self, event: PlayerEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl AudioPlayer for MockPlayer {
    fn player_type(&self) -> PlayerType {
        PlayerType::NativeEngine
    }

    fn play(&self) {
        self.plays.fetch_add(1, Ordering::SeqCst);
        let next = if self.auto_confirm.load(Ordering::SeqCst) {
            PlaybackState::Playing
        } else {
            PlaybackState::Loading
        };
        self.set_state(next);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.set_state(PlaybackState::Idle);
    }

    fn state(&self) -> PlaybackState {
        *self.state.lock()
    }

    fn state_stream(&self) -> BoxStream<'static, PlaybackState> {
        receiver_stream(self.state_tx.subscribe())
    }

    fn event_stream(&self) -> BoxStream<'static, PlayerEvent> {
        receiver_stream(self.event_tx.subscribe())
    }

    fn audio_buffer_stream(&self) -> BoxStream<'static, AudioFrameChunk> {
        futures::stream::empty().boxed()
    }

    fn install_render_tap(&self) {
        self.tap_installs.fetch_add(1, Ordering::SeqCst);
        self.tap.store(true, Ordering::SeqCst);
    }

    fn remove_render_tap(&self) {
        self.tap_removals.fetch_add(1, Ordering::SeqCst);
        self.tap.store(false, Ordering::SeqCst);
    }

    fn is_render_tap_installed(&self) -> bool {
        self.tap.load(Ordering::SeqCst)
    }
}

fn receiver_stream<T: Clone + Send + 'static>(
    receiver: broadcast::Receiver<T>,
) -> BoxStream<'static, T> {
    futures::stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(value) => return Some((value, receiver)),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

pub fn session_error() -> BridgeError {
    BridgeError::Session("session busy".into())
}

// ============================================================================
// Waiting
// ============================================================================

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Wait until `player` reports `expected`.
pub async fn wait_for_state(player: &dyn AudioPlayer, expected: PlaybackState) -> bool {
    eventually(|| player.state() == expected).await
}

/// Let spawned tasks run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}
