//! Buffered network streaming backend.
//!
//! Decoded frames from a [`StreamTransport`] land in a fixed-capacity
//! [`RingBuffer`]; the hardware render callback pulls from it through
//! [`BufferedStreamPlayer::render`].
//!
//! ```text
//! StreamTransport ──Frames──> RingBuffer ──render()──> audio output
//!                     │
//!                     └──(render tap installed)──> audio_buffer_stream
//! ```
//!
//! Playback starts once `min_buffered_frames` are buffered. A short read
//! while playing is an underrun and stalls the player; if the network keeps
//! delivering, the buffer refills and the player recovers by itself.

use crate::analytics::Analytics;
use crate::player::{
    broadcast_stream, spawn_transport_pump, AudioPlayer, PlaybackState, PlayerCore, PlayerEvent,
    TransportEventHandler,
};
use crate::ring_buffer::RingBuffer;
use bridge_traits::{
    transport_channel, AudioFrameChunk, PlaybackMarker, PlayerType, RecoveryMethod,
    StreamTransport, TransportError, TransportEvent,
};
use core_runtime::config::BufferingConfig;
use core_runtime::logging::redact_stream_url;
use futures::stream::BoxStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const BUFFER_STREAM_CAPACITY: usize = 32;

/// [`AudioPlayer`] backed by a network streaming engine and a local ring buffer.
pub struct BufferedStreamPlayer {
    core: PlayerCore,
    transport: Arc<dyn StreamTransport>,
    stream_url: String,
    buffering: BufferingConfig,
    ring: RingBuffer,
    tap_installed: AtomicBool,
    buffer_tx: broadcast::Sender<AudioFrameChunk>,
}

impl BufferedStreamPlayer {
    /// Create the player and attach it to `transport`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        stream_url: impl Into<String>,
        buffering: BufferingConfig,
        analytics: Analytics,
    ) -> Arc<Self> {
        let (buffer_tx, _) = broadcast::channel(BUFFER_STREAM_CAPACITY);
        let player = Arc::new(Self {
            core: PlayerCore::new(PlayerType::BufferedStream, analytics),
            transport,
            stream_url: stream_url.into(),
            ring: RingBuffer::new(buffering.buffer_samples()),
            buffering,
            tap_installed: AtomicBool::new(false),
            buffer_tx,
        });

        let (sender, receiver) = transport_channel();
        player.transport.attach(sender);
        player
            .core
            .set_pump(spawn_transport_pump(&player, receiver));

        player
    }

    pub fn buffering(&self) -> &BufferingConfig {
        &self.buffering
    }

    /// Buffered audio in frames.
    pub fn buffered_frames(&self) -> usize {
        self.ring.available() / self.buffering.channels.max(1) as usize
    }

    /// Hardware pull: fill `output` with interleaved samples.
    ///
    /// Anything the buffer cannot supply is filled with silence. A short read
    /// while playing is an underrun and stalls the player. Returns the number
    /// of real samples written.
    pub fn render(&self, output: &mut [f32]) -> usize {
        let mut guard = self.core.lock();
        if guard.state != PlaybackState::Playing {
            output.fill(0.0);
            return 0;
        }

        let read = self.ring.read(output);
        if read < output.len() {
            output[read..].fill(0.0);
            if self.core.enter_stall(&mut guard) {
                warn!(
                    requested = output.len(),
                    read, "Buffer underrun; stream stalled"
                );
            }
        }
        read
    }

    fn on_frames(&self, chunk: AudioFrameChunk) {
        let mut guard = self.core.lock();
        if guard.state == PlaybackState::Idle {
            return;
        }

        let dropped = self.ring.write(&chunk.samples);
        if dropped > 0 {
            debug!(dropped, "Ring buffer full; dropped oldest samples");
        }

        if self.tap_installed.load(Ordering::Acquire) {
            let _ = self.buffer_tx.send(chunk);
        }

        let threshold = self.buffering.min_buffer_samples().max(1);
        if self.ring.available() < threshold {
            return;
        }

        match guard.state {
            PlaybackState::Loading => {
                if let Some(stall) = self.core.enter_playing(&mut guard) {
                    info!(stall_ms = stall.as_millis() as u64, "Reconnected stream recovered");
                }
            }
            PlaybackState::Stalled => {
                if let Some(stall_duration) = self.core.enter_playing(&mut guard) {
                    drop(guard);
                    info!(
                        stall_ms = stall_duration.as_millis() as u64,
                        "Buffer refilled; stream recovered"
                    );
                    self.core.analytics().marker(
                        PlaybackMarker::StallRecovered { stall_duration },
                        PlayerType::BufferedStream,
                    );
                }
            }
            PlaybackState::Idle | PlaybackState::Playing => {}
        }
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
            "Stream transport failed; disconnecting"
        );

        let session_duration = guard.session_duration();
        let stall_duration = guard.stall_duration();
        self.transport.disconnect();
        self.ring.clear();
        self.core.transition(&mut guard, PlaybackState::Idle);
        drop(guard);

        self.core.analytics().stream_error(
            error.error_type(),
            RecoveryMethod::ManualRetry,
            PlayerType::BufferedStream,
            session_duration,
            stall_duration,
            0,
        );
    }
}

impl TransportEventHandler for BufferedStreamPlayer {
    fn handle_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Frames(chunk) => self.on_frames(chunk),
            TransportEvent::Stalled => {
                let mut guard = self.core.lock();
                if self.core.enter_stall(&mut guard) {
                    warn!("Stream transport reported a stall");
                }
            }
            TransportEvent::RateChanged { rate } => {
                debug!(rate, "Rate changes are not used by the buffered backend");
            }
            TransportEvent::Failed(error) => self.fail(error),
        }
    }
}

impl AudioPlayer for BufferedStreamPlayer {
    fn player_type(&self) -> PlayerType {
        PlayerType::BufferedStream
    }

    fn play(&self) {
        let mut guard = self.core.lock();
        match guard.state {
            PlaybackState::Loading | PlaybackState::Playing => {
                drop(guard);
                debug!("play() while already active");
                self.core
                    .analytics()
                    .marker(PlaybackMarker::AlreadyPlaying, PlayerType::BufferedStream);
            }
            PlaybackState::Idle | PlaybackState::Stalled => {
                if guard.state == PlaybackState::Stalled {
                    guard.recovering = true;
                } else {
                    guard.play_started_at = Some(Instant::now());
                }
                // Never resume stale audio.
                self.ring.clear();
                self.core.transition(&mut guard, PlaybackState::Loading);
                debug!(
                    stream_url = %redact_stream_url(&self.stream_url),
                    min_buffered_frames = self.buffering.min_buffered_frames,
                    "Connecting to live stream"
                );
                self.transport.connect(&self.stream_url);
            }
        }
    }

    fn stop(&self) {
        let mut guard = self.core.lock();
        if guard.state == PlaybackState::Idle {
            return;
        }
        self.transport.disconnect();
        self.ring.clear();
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
        broadcast_stream(self.buffer_tx.subscribe())
    }

    fn install_render_tap(&self) {
        self.tap_installed.store(true, Ordering::Release);
    }

    fn remove_render_tap(&self) {
        self.tap_installed.store(false, Ordering::Release);
    }

    fn is_render_tap_installed(&self) -> bool {
        self.tap_installed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for BufferedStreamPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedStreamPlayer")
            .field("state", &self.core.state())
            .field("stream_url", &redact_stream_url(&self.stream_url))
            .field("ring", &self.ring)
            .finish()
    }
}
