//! # Playback Controller
//!
//! Orchestrates one [`AudioPlayer`] on behalf of the user and the OS.
//!
//! ## Overview
//!
//! The controller owns everything the player does not:
//!
//! - **Intent**: whether the user wants audio, independent of transport state
//! - **Session ownership**: the shared audio session is only deactivated by
//!   the controller if the controller activated it
//! - **System policy**: interruptions, route changes, background/foreground
//! - **Reconnection**: stalls are retried with capped exponential backoff
//! - **Analytics**: `Started`/`Stopped`/`StreamError` capture
//!
//! ## Concurrency
//!
//! All state lives behind one mutex; every entry point (user commands,
//! system signals, player events, the reconnect timer) takes it, so reactions
//! are serialized. Lock order is always controller then player. Player events
//! reach the controller through a watcher task subscribed at construction.
//!
//! At most one reconnect loop runs per controller. It is cancelled by
//! [`stop`](PlaybackController::stop), by a manual
//! [`play`](PlaybackController::play), or by the player reaching playing.
//!
//! ## Usage
//!
//! ```ignore
//! let controller = PlaybackController::new(player, session, analytics, ControllerOptions::default());
//! controller.attach_signals(Arc::new(event_bus)).await?;
//!
//! controller.play("user tapped play")?;
//! controller.toggle("user tapped pause")?;
//! ```

use crate::analytics::Analytics;
use crate::backoff::BackoffPolicy;
use crate::error::{PlaybackError, Result};
use crate::player::{AudioPlayer, PlaybackState, PlayerEvent};
use bridge_traits::{
    AudioFrameChunk, AudioSession, LifecycleState, PlaybackSessionId, RecoveryMethod,
    RouteChangeReason, SignalSource, StreamErrorType, SystemSignal,
};
use core_runtime::config::{BackoffConfig, PlaybackConfig};
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

const REASON_INTERRUPTION_BEGAN: &str = "interruption began";
const REASON_INTERRUPTION_ENDED: &str = "interruption ended";
const REASON_ROUTE_DISCONNECTED: &str = "route disconnected";
const REASON_STALLED: &str = "stalled";

/// Controller tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub backoff: BackoffConfig,
    /// Whether an explicit stop clears the reconnect attempt counter.
    pub reset_backoff_on_stop: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            reset_backoff_on_stop: true,
        }
    }
}

impl From<&PlaybackConfig> for ControllerOptions {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            backoff: config.backoff,
            reset_backoff_on_stop: config.reset_backoff_on_stop,
        }
    }
}

#[derive(Debug)]
struct ControllerState {
    playback_intended: bool,
    /// The controller activated the session and has not released it.
    session_owned: bool,
    render_tap_desired: bool,
    backgrounded: bool,
    /// An interruption stopped playback that was intended.
    interrupted_while_playing: bool,
    play_started_at: Option<Instant>,
    stall_started_at: Option<Instant>,
    backoff: BackoffPolicy,
    backoff_exhausted: bool,
    reconnect: Option<CancellationToken>,
    session_id: Option<PlaybackSessionId>,
}

impl ControllerState {
    fn new(backoff: BackoffConfig) -> Self {
        Self {
            playback_intended: false,
            session_owned: false,
            render_tap_desired: false,
            backgrounded: false,
            interrupted_while_playing: false,
            play_started_at: None,
            stall_started_at: None,
            backoff: BackoffPolicy::new(backoff),
            backoff_exhausted: false,
            reconnect: None,
            session_id: None,
        }
    }

    fn session_duration(&self) -> Duration {
        self.play_started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    fn cancel_reconnect(&mut self) {
        if let Some(token) = self.reconnect.take() {
            debug!("Cancelling pending reconnect");
            token.cancel();
        }
    }

    fn reset_backoff(&mut self) {
        self.backoff.reset();
        self.backoff_exhausted = false;
    }
}

struct Inner {
    player: Arc<dyn AudioPlayer>,
    session: Arc<dyn AudioSession>,
    analytics: Analytics,
    options: ControllerOptions,
    state: Mutex<ControllerState>,
    shutdown: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Playback orchestration over one [`AudioPlayer`].
///
/// Cheap to clone; clones share the same state. Construct one per process
/// and hand it to consumers.
#[derive(Clone)]
pub struct PlaybackController {
    inner: Arc<Inner>,
}

impl PlaybackController {
    /// Create a controller driving `player`.
    ///
    /// Must be called inside a tokio runtime: player events are observed on
    /// a spawned watcher task.
    pub fn new(
        player: Arc<dyn AudioPlayer>,
        session: Arc<dyn AudioSession>,
        analytics: Analytics,
        options: ControllerOptions,
    ) -> Self {
        let inner = Arc::new(Inner {
            player,
            session,
            analytics,
            options,
            state: Mutex::new(ControllerState::new(options.backoff)),
            shutdown: CancellationToken::new(),
        });

        // Subscribe before spawning so no early transition is missed.
        let states = inner.player.state_stream();
        let events = inner.player.event_stream();
        tokio::spawn(watch_player(
            Arc::downgrade(&inner),
            inner.shutdown.clone(),
            states,
            events,
        ));

        Self { inner }
    }

    fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    // ------------------------------------------------------------------
    // User commands
    // ------------------------------------------------------------------

    /// Start playback and record `Started` with `reason` exactly as given.
    ///
    /// Supersedes any pending reconnect. After the reconnect attempts ran
    /// out, a manual play starts a fresh backoff budget.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::AudioSession`] if the session cannot be activated.
    /// Nothing else changes in that case.
    #[instrument(skip(self))]
    pub fn play(&self, reason: &str) -> Result<()> {
        let mut state = self.inner.state.lock();
        self.play_locked(&mut state)?;
        drop(state);

        self.inner.analytics.started(reason);
        Ok(())
    }

    /// Stop playback without recording analytics.
    ///
    /// Releases the audio session only if this controller activated it.
    #[instrument(skip(self))]
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        self.stop_locked(&mut state);
    }

    /// Stop when playing (or about to play), otherwise play.
    ///
    /// A user-initiated stop records `Stopped` with no reason and the time
    /// since the last successful play.
    #[instrument(skip(self))]
    pub fn toggle(&self, reason: &str) -> Result<()> {
        let mut state = self.inner.state.lock();
        if self.inner.player.is_playing() || state.playback_intended {
            let duration = state.session_duration();
            self.inner.analytics.stopped(None, duration);
            self.stop_locked(&mut state);
            return Ok(());
        }

        self.play_locked(&mut state)?;
        drop(state);
        self.inner.analytics.started(reason);
        Ok(())
    }

    /// Record that the UI wants the render tap.
    ///
    /// While backgrounded installation is deferred until foreground.
    pub fn install_render_tap(&self) {
        let mut state = self.inner.state.lock();
        state.render_tap_desired = true;
        if state.backgrounded {
            debug!("Render tap requested in background; deferring");
            return;
        }
        self.inner.player.install_render_tap();
    }

    pub fn remove_render_tap(&self) {
        let mut state = self.inner.state.lock();
        state.render_tap_desired = false;
        self.inner.player.remove_render_tap();
    }

    // ------------------------------------------------------------------
    // System signals
    // ------------------------------------------------------------------

    /// Single dispatch point for OS signals.
    pub fn handle_signal(&self, signal: SystemSignal) {
        debug!(?signal, "Handling system signal");
        match signal {
            SystemSignal::InterruptionBegan { should_resume } => {
                self.handle_interruption_began(should_resume)
            }
            SystemSignal::InterruptionEnded { should_resume } => {
                self.handle_interruption_ended(should_resume)
            }
            SystemSignal::RouteChanged { reason } => self.handle_route_change(reason),
            SystemSignal::Lifecycle {
                state: LifecycleState::Background | LifecycleState::Suspended,
            } => self.handle_app_did_enter_background(),
            SystemSignal::Lifecycle {
                state: LifecycleState::Foreground,
            } => self.handle_app_will_enter_foreground(),
        }
    }

    /// An interruption always stops playback; the resume hint only matters
    /// when the interruption ends.
    pub fn handle_interruption_began(&self, should_resume: bool) {
        let mut state = self.inner.state.lock();
        if !(state.playback_intended || self.inner.player.is_playing()) {
            debug!(should_resume, "Interruption began while not playing");
            return;
        }

        info!(should_resume, "Interruption began; stopping playback");
        let duration = state.session_duration();
        self.inner
            .analytics
            .stopped(Some(REASON_INTERRUPTION_BEGAN), duration);
        self.stop_locked(&mut state);
        state.interrupted_while_playing = true;
    }

    /// Resume after an interruption that stopped playback, when the OS
    /// says resuming is appropriate.
    pub fn handle_interruption_ended(&self, should_resume: bool) {
        let mut state = self.inner.state.lock();
        let was_interrupted = std::mem::take(&mut state.interrupted_while_playing);
        drop(state);

        if !(should_resume && was_interrupted) {
            debug!(should_resume, was_interrupted, "Interruption ended; staying stopped");
            return;
        }

        info!("Interruption ended; resuming");
        if let Err(err) = self.play(REASON_INTERRUPTION_ENDED) {
            warn!(error = %err, "Failed to resume after interruption");
        }
    }

    /// Stop when the previous output device went away; ignore every other
    /// route change.
    pub fn handle_route_change(&self, reason: RouteChangeReason) {
        if !reason.is_device_loss() {
            debug!(?reason, "Route change does not affect playback");
            return;
        }

        let mut state = self.inner.state.lock();
        if !(state.playback_intended || self.inner.player.is_playing()) {
            debug!("Output device lost while not playing");
            return;
        }

        info!("Output device lost; stopping playback");
        let duration = state.session_duration();
        self.inner
            .analytics
            .stopped(Some(REASON_ROUTE_DISCONNECTED), duration);
        self.stop_locked(&mut state);
    }

    /// Drop the render tap and, when nothing should play, the session the
    /// controller owns. Intended playback keeps running.
    pub fn handle_app_did_enter_background(&self) {
        let mut state = self.inner.state.lock();
        state.backgrounded = true;

        if self.inner.player.is_render_tap_installed() {
            debug!("Removing render tap for background");
            self.inner.player.remove_render_tap();
        }

        if !state.playback_intended {
            self.release_session(&mut state);
        }
    }

    /// Reassert the session for intended playback and restore a desired
    /// render tap.
    pub fn handle_app_will_enter_foreground(&self) {
        let mut state = self.inner.state.lock();
        state.backgrounded = false;

        if state.playback_intended {
            match self.inner.session.activate() {
                Ok(()) => state.session_owned = true,
                Err(err) => warn!(error = %err, "Failed to reactivate audio session"),
            }
        }

        if state.render_tap_desired {
            self.inner.player.install_render_tap();
        }
    }

    /// Subscribe to `source` and apply its signals until the controller is
    /// dropped or the source ends.
    ///
    /// The subscription is established before this returns.
    pub async fn attach_signals(&self, source: Arc<dyn SignalSource>) -> Result<JoinHandle<()>> {
        let mut signals = source
            .subscribe()
            .await
            .map_err(PlaybackError::SignalSource)?;
        let weak = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    signal = signals.next() => {
                        let Some(signal) = signal else {
                            debug!("Signal source ended");
                            break;
                        };
                        let Some(inner) = weak.upgrade() else {
                            break;
                        };
                        PlaybackController::from_inner(inner).handle_signal(signal);
                    }
                }
            }
        }))
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn state(&self) -> PlaybackState {
        self.inner.player.state()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.player.is_playing()
    }

    pub fn playback_intended(&self) -> bool {
        self.inner.state.lock().playback_intended
    }

    pub fn render_tap_desired(&self) -> bool {
        self.inner.state.lock().render_tap_desired
    }

    /// Reconnect attempts since the last reset.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.state.lock().backoff.attempts()
    }

    pub fn is_reconnecting(&self) -> bool {
        self.inner.state.lock().reconnect.is_some()
    }

    /// Identifier of the current listening session, if any.
    pub fn session_id(&self) -> Option<PlaybackSessionId> {
        self.inner.state.lock().session_id
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.inner.options
    }

    pub fn player(&self) -> Arc<dyn AudioPlayer> {
        Arc::clone(&self.inner.player)
    }

    pub fn state_stream(&self) -> BoxStream<'static, PlaybackState> {
        self.inner.player.state_stream()
    }

    pub fn event_stream(&self) -> BoxStream<'static, PlayerEvent> {
        self.inner.player.event_stream()
    }

    pub fn audio_buffer_stream(&self) -> BoxStream<'static, AudioFrameChunk> {
        self.inner.player.audio_buffer_stream()
    }

    // ------------------------------------------------------------------
    // Internals (state lock held)
    // ------------------------------------------------------------------

    fn play_locked(&self, state: &mut ControllerState) -> Result<()> {
        state.cancel_reconnect();
        if state.backoff_exhausted {
            state.reset_backoff();
        }

        if !state.session_owned {
            self.inner
                .session
                .activate()
                .map_err(PlaybackError::AudioSession)?;
            state.session_owned = true;
        }

        state.playback_intended = true;
        state.interrupted_while_playing = false;

        if state.play_started_at.is_none() || self.inner.player.state() == PlaybackState::Idle {
            let session_id = PlaybackSessionId::new();
            state.play_started_at = Some(Instant::now());
            state.session_id = Some(session_id);
            info!(
                %session_id,
                player_type = self.inner.player.player_type().as_str(),
                "Starting playback"
            );
        }

        self.inner.player.play();
        Ok(())
    }

    fn stop_locked(&self, state: &mut ControllerState) {
        state.cancel_reconnect();
        self.inner.player.stop();

        state.playback_intended = false;
        state.play_started_at = None;
        state.stall_started_at = None;
        if self.inner.options.reset_backoff_on_stop {
            state.reset_backoff();
        }

        self.release_session(state);
    }

    /// Deactivate the session only if this controller activated it.
    fn release_session(&self, state: &mut ControllerState) {
        if !state.session_owned {
            return;
        }
        state.session_owned = false;
        if let Err(err) = self.inner.session.deactivate() {
            warn!(error = %err, "Failed to deactivate audio session");
        }
    }

    // ------------------------------------------------------------------
    // Player feedback
    // ------------------------------------------------------------------

    fn on_player_state(&self, next: PlaybackState) {
        let mut state = self.inner.state.lock();
        match next {
            PlaybackState::Playing => {
                // States and events travel on separate channels; a stall may
                // already have superseded this notification.
                if self.inner.player.state() != PlaybackState::Playing {
                    debug!("Ignoring stale playing notification");
                    return;
                }
                if state.backoff.attempts() > 0 || state.reconnect.is_some() {
                    info!(
                        attempts = state.backoff.attempts(),
                        "Playback confirmed; resetting backoff"
                    );
                }
                state.cancel_reconnect();
                state.reset_backoff();
                state.stall_started_at = None;
            }
            PlaybackState::Idle => {
                // The player fell idle on its own (transport failure).
                if state.playback_intended && self.inner.player.state() == PlaybackState::Idle {
                    info!("Player went idle unexpectedly; clearing playback intent");
                    state.cancel_reconnect();
                    state.playback_intended = false;
                    state.play_started_at = None;
                    state.stall_started_at = None;
                    self.release_session(&mut state);
                }
            }
            PlaybackState::Loading | PlaybackState::Stalled => {}
        }
    }

    fn on_player_event(&self, event: PlayerEvent) {
        match event {
            PlayerEvent::Stall => self.on_stall(),
            PlayerEvent::Recovery => debug!("Player reported recovery"),
        }
    }

    fn on_stall(&self) {
        let mut state = self.inner.state.lock();
        if !state.playback_intended {
            debug!("Stall without playback intent; ignoring");
            return;
        }
        if self.inner.player.is_playing() {
            debug!("Player already recovered; no reconnect needed");
            return;
        }
        if state.reconnect.is_some() {
            debug!("Reconnect already scheduled");
            return;
        }
        if state.backoff_exhausted {
            debug!("Reconnect attempts exhausted; waiting for manual retry");
            return;
        }

        state.stall_started_at.get_or_insert_with(Instant::now);
        let token = self.inner.shutdown.child_token();
        state.reconnect = Some(token.clone());
        warn!(
            attempt = state.backoff.attempts(),
            delay_ms = state.backoff.next_delay().as_millis() as u64,
            "Playback stalled; scheduling reconnect"
        );

        tokio::spawn(reconnect_loop(Arc::downgrade(&self.inner), token));
    }

    /// Give up: report, stop, and wait for the user.
    fn exhaust_backoff(&self, state: &mut ControllerState) {
        let attempts = state.backoff.attempts();
        let session_duration = state.session_duration();
        let stall_duration = state.stall_started_at.map(|started| started.elapsed());

        warn!(attempts, "Reconnect attempts exhausted; stopping playback");

        self.inner.analytics.stream_error(
            StreamErrorType::BackoffExhausted,
            RecoveryMethod::RetryWithBackoff,
            self.inner.player.player_type(),
            session_duration,
            stall_duration,
            attempts,
        );
        self.inner
            .analytics
            .stopped(Some(REASON_STALLED), session_duration);

        state.reconnect = None;
        self.inner.player.stop();
        state.playback_intended = false;
        state.play_started_at = None;
        state.stall_started_at = None;
        state.backoff_exhausted = true;
        self.release_session(state);
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PlaybackController")
            .field("player_type", &self.inner.player.player_type())
            .field("state", &self.inner.player.state())
            .field("playback_intended", &state.playback_intended)
            .field("reconnect_attempts", &state.backoff.attempts())
            .finish()
    }
}

async fn watch_player(
    inner: Weak<Inner>,
    shutdown: CancellationToken,
    mut states: BoxStream<'static, PlaybackState>,
    mut events: BoxStream<'static, PlayerEvent>,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            Some(next) = states.next() => {
                let Some(inner) = inner.upgrade() else { break };
                PlaybackController::from_inner(inner).on_player_state(next);
            }
            Some(event) = events.next() => {
                let Some(inner) = inner.upgrade() else { break };
                PlaybackController::from_inner(inner).on_player_event(event);
            }
            else => break,
        }
    }
}

/// Strictly sequential reconnect attempts for one stall episode.
///
/// Each round waits `next_delay()`; that wait also serves as the window in
/// which the previous attempt may reach playing.
async fn reconnect_loop(inner: Weak<Inner>, token: CancellationToken) {
    loop {
        let delay = {
            let Some(inner) = inner.upgrade() else { return };
            let delay = inner.state.lock().backoff.next_delay();
            delay
        };

        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        let Some(inner) = inner.upgrade() else { return };
        let controller = PlaybackController::from_inner(inner);
        let mut state = controller.inner.state.lock();

        // A stop or manual play may have won the race for the lock.
        if token.is_cancelled() {
            return;
        }

        if controller.inner.player.is_playing() {
            state.reset_backoff();
            state.reconnect = None;
            state.stall_started_at = None;
            return;
        }

        if state.backoff.is_exhausted() {
            controller.exhaust_backoff(&mut state);
            return;
        }

        state.backoff.record_attempt();
        info!(
            attempt = state.backoff.attempts(),
            delay_ms = delay.as_millis() as u64,
            "Reconnecting live stream"
        );
        // A previous attempt still loading never confirmed; start over.
        if controller.inner.player.state() == PlaybackState::Loading {
            controller.inner.player.stop();
        }
        controller.inner.player.play();
    }
}
