//! Native media engine backend.
//!
//! Wraps an [`EngineTransport`]. The engine gives no buffer-level access:
//! "playing" is inferred from a positive rate change after loading, there is
//! no self-healing after a stall, and the audio buffer stream is always empty.

use crate::analytics::Analytics;
use crate::player::{
    spawn_transport_pump, AudioPlayer, PlaybackState, PlayerCore, PlayerEvent,
    TransportEventHandler,
};
use bridge_traits::{
    transport_channel, AudioFrameChunk, EngineTransport, PlaybackMarker, PlayerType,
    RecoveryMethod, TransportError, TransportEvent,
};
use core_runtime::logging::redact_stream_url;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// [`AudioPlayer`] backed by the platform media engine.
pub struct NativeEnginePlayer {
    core: PlayerCore,
    transport: Arc<dyn EngineTransport>,
    stream_url: String,
    tap_installed: Mutex<bool>,
}

impl NativeEnginePlayer {
    /// Create the player and attach it to `transport`.
    ///
    /// Must be called inside a tokio runtime: transport callbacks are applied
    /// on a spawned task.
    pub fn new(
        transport: Arc<dyn EngineTransport>,
        stream_url: impl Into<String>,
        analytics: Analytics,
    ) -> Arc<Self> {
        let player = Arc::new(Self {
            core: PlayerCore::new(PlayerType::NativeEngine, analytics),
            transport,
            stream_url: stream_url.into(),
            tap_installed: Mutex::new(false),
        });

        let (sender, receiver) = transport_channel();
        player.transport.attach(sender);
        player
            .core
            .set_pump(spawn_transport_pump(&player, receiver));

        player
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    fn fail(&self, error: TransportError) {
        let mut guard = self.core.lock();
        if guard.state == PlaybackState::Idle {
            debug!(%error, "Ignoring transport failure while idle");
            return;
        }

        warn!(
            %error,
            state = guard.state.as_str(),
            stream_url = %redact_stream_url(&self.stream_url),
            "Native engine failed; releasing item"
        );

        let session_duration = guard.session_duration();
        let stall_duration = guard.stall_duration();
        self.transport.pause();
        self.transport.unload();
        self.core.transition(&mut guard, PlaybackState::Idle);
        drop(guard);

        self.core.analytics().stream_error(
            error.error_type(),
            RecoveryMethod::ManualRetry,
            PlayerType::NativeEngine,
            session_duration,
            stall_duration,
            0,
        );
    }
}

impl TransportEventHandler for NativeEnginePlayer {
    fn handle_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::RateChanged { rate } => {
                let mut guard = self.core.lock();
                if rate > 0.0 && guard.state == PlaybackState::Loading {
                    if let Some(stall) = self.core.enter_playing(&mut guard) {
                        info!(stall_ms = stall.as_millis() as u64, "Native engine recovered");
                    }
                } else {
                    debug!(rate, state = guard.state.as_str(), "Rate change ignored");
                }
            }
            TransportEvent::Stalled => {
                let mut guard = self.core.lock();
                if self.core.enter_stall(&mut guard) {
                    warn!("Native engine stalled");
                }
            }
            TransportEvent::Frames(_) => {
                debug!("Native engine does not expose audio frames");
            }
            TransportEvent::Failed(error) => self.fail(error),
        }
    }
}

impl AudioPlayer for NativeEnginePlayer {
    fn player_type(&self) -> PlayerType {
        PlayerType::NativeEngine
    }

    fn play(&self) {
        let mut guard = self.core.lock();
        match guard.state {
            PlaybackState::Loading | PlaybackState::Playing => {
                drop(guard);
                debug!("play() while already active");
                self.core
                    .analytics()
                    .marker(PlaybackMarker::AlreadyPlaying, PlayerType::NativeEngine);
            }
            PlaybackState::Idle | PlaybackState::Stalled => {
                if guard.state == PlaybackState::Stalled {
                    guard.recovering = true;
                } else {
                    guard.play_started_at = Some(Instant::now());
                }
                self.core.transition(&mut guard, PlaybackState::Loading);
                debug!(
                    stream_url = %redact_stream_url(&self.stream_url),
                    "Loading fresh live item"
                );
                self.transport.load(&self.stream_url);
                self.transport.play();
            }
        }
    }

    fn stop(&self) {
        let mut guard = self.core.lock();
        if guard.state == PlaybackState::Idle {
            return;
        }
        self.transport.pause();
        // Replace the item so the next play() joins the live edge.
        self.transport.unload();
        self.core.transition(&mut guard, PlaybackState::Idle);
    }

    fn state(&self) -> PlaybackState {
        self.core.state()
    }

    fn state_stream(&self) -> BoxStream<'static, PlaybackState> {
        self.core.state_stream()
    }

    fn event_stream(&self) -> BoxStream<'static, PlayerEvent> {
        self.core.event_stream()
    }

    fn audio_buffer_stream(&self) -> BoxStream<'static, AudioFrameChunk> {
        futures::stream::empty().boxed()
    }

    fn install_render_tap(&self) {
        let mut installed = self.tap_installed.lock();
        if *installed {
            return;
        }
        match self.transport.install_tap() {
            Ok(()) => *installed = true,
            Err(err) => warn!(error = %err, "Failed to install render tap"),
        }
    }

    fn remove_render_tap(&self) {
        let mut installed = self.tap_installed.lock();
        if *installed {
            self.transport.remove_tap();
            *installed = false;
        }
    }

    fn is_render_tap_installed(&self) -> bool {
        *self.tap_installed.lock()
    }
}

impl std::fmt::Debug for NativeEnginePlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEnginePlayer")
            .field("state", &self.core.state())
            .field("stream_url", &redact_stream_url(&self.stream_url))
            .finish()
    }
}
