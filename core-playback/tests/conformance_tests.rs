//! Behavioral conformance suite shared by every player backend.
//!
//! Each test is instantiated once per backend through `conformance_suite!`;
//! both backends must observe the same contract even though one infers
//! playback from rate changes and the other from buffered frames.

mod common;

use bridge_traits::{AnalyticsEvent, PlaybackMarker, TransportEvent, TransportError};
use common::*;
use core_playback::{
    Analytics, AudioPlayer, BufferedStreamPlayer, NativeEnginePlayer, PlaybackState, PlayerEvent,
    TransportEventHandler,
};
use core_runtime::config::BufferingConfig;
use futures::StreamExt;
use std::sync::Arc;

// ============================================================================
// Harnesses
// ============================================================================

trait Harness {
    fn new() -> Self;
    fn player(&self) -> Arc<dyn AudioPlayer>;
    fn analytics(&self) -> &RecordingAnalytics;
    /// Drive the transport until audio is flowing.
    fn confirm(&self);
    /// Same as `confirm`, posted through the attached event channel.
    fn post_confirm(&self);
    fn stall(&self);
    fn fail(&self, error: TransportError);
    /// Transport reset calls ("replace current item" or disconnect).
    fn resets(&self) -> usize;
    /// Fresh connections opened.
    fn connects(&self) -> usize;
}

struct NativeHarness {
    transport: Arc<FakeEngineTransport>,
    analytics: Arc<RecordingAnalytics>,
    player: Arc<NativeEnginePlayer>,
}

impl Harness for NativeHarness {
    fn new() -> Self {
        let transport = Arc::new(FakeEngineTransport::default());
        let analytics = Arc::new(RecordingAnalytics::default());
        let player = NativeEnginePlayer::new(
            transport.clone(),
            STREAM_URL,
            Analytics::new(Some(analytics.clone())),
        );
        Self {
            transport,
            analytics,
            player,
        }
    }

    fn player(&self) -> Arc<dyn AudioPlayer> {
        self.player.clone()
    }

    fn analytics(&self) -> &RecordingAnalytics {
        &self.analytics
    }

    fn confirm(&self) {
        self.player
            .handle_transport_event(TransportEvent::RateChanged { rate: 1.0 });
    }

    fn post_confirm(&self) {
        self.transport
            .emit(TransportEvent::RateChanged { rate: 1.0 });
    }

    fn stall(&self) {
        self.player.handle_transport_event(TransportEvent::Stalled);
    }

    fn fail(&self, error: TransportError) {
        self.player
            .handle_transport_event(TransportEvent::Failed(error));
    }

    fn resets(&self) -> usize {
        self.transport.unloads()
    }

    fn connects(&self) -> usize {
        self.transport.loads()
    }
}

struct BufferedHarness {
    transport: Arc<FakeStreamTransport>,
    analytics: Arc<RecordingAnalytics>,
    player: Arc<BufferedStreamPlayer>,
}

const MIN_FRAMES: usize = 16;

impl Harness for BufferedHarness {
    fn new() -> Self {
        let transport = Arc::new(FakeStreamTransport::default());
        let analytics = Arc::new(RecordingAnalytics::default());
        let buffering = BufferingConfig {
            buffer_frames: 64,
            min_buffered_frames: MIN_FRAMES,
            channels: 2,
        };
        let player = BufferedStreamPlayer::new(
            transport.clone(),
            STREAM_URL,
            buffering,
            Analytics::new(Some(analytics.clone())),
        );
        Self {
            transport,
            analytics,
            player,
        }
    }

    fn player(&self) -> Arc<dyn AudioPlayer> {
        self.player.clone()
    }

    fn analytics(&self) -> &RecordingAnalytics {
        &self.analytics
    }

    fn confirm(&self) {
        self.player.handle_transport_event(frames(MIN_FRAMES));
    }

    fn post_confirm(&self) {
        self.transport.emit(frames(MIN_FRAMES));
    }

    fn stall(&self) {
        self.player.handle_transport_event(TransportEvent::Stalled);
    }

    fn fail(&self, error: TransportError) {
        self.player
            .handle_transport_event(TransportEvent::Failed(error));
    }

    fn resets(&self) -> usize {
        self.transport.disconnects()
    }

    fn connects(&self) -> usize {
        self.transport.connects()
    }
}

// ============================================================================
// Contract
// ============================================================================

fn play_reaches_playing<H: Harness>() {
    let h = H::new();
    let player = h.player();

    player.play();
    assert_eq!(player.state(), PlaybackState::Loading);

    h.confirm();
    assert_eq!(player.state(), PlaybackState::Playing);
    assert!(player.is_playing());
}

fn stop_never_records_stopped<H: Harness>() {
    let h = H::new();
    let player = h.player();

    player.play();
    h.confirm();
    player.stop();

    assert_eq!(player.state(), PlaybackState::Idle);
    assert_eq!(h.analytics().count("playback_stopped"), 0);
}

fn stop_resets_connection_once_per_stop<H: Harness>() {
    let h = H::new();
    let player = h.player();

    player.play();
    h.confirm();
    player.stop();
    assert_eq!(h.resets(), 1);

    player.play();
    h.confirm();
    player.stop();
    assert_eq!(h.resets(), 2);
    assert_eq!(h.connects(), 2);
}

fn repeated_play_is_idempotent<H: Harness>() {
    let h = H::new();
    let player = h.player();

    player.play();
    player.play();
    h.confirm();
    player.play();

    assert_eq!(player.state(), PlaybackState::Playing);
    assert_eq!(h.connects(), 1);

    let already_playing = h
        .analytics()
        .events()
        .into_iter()
        .filter(|event| {
            matches!(
                event,
                AnalyticsEvent::PlaybackMarker {
                    marker: PlaybackMarker::AlreadyPlaying,
                    ..
                }
            )
        })
        .count();
    assert_eq!(already_playing, 2);
}

fn repeated_stop_while_idle_is_safe<H: Harness>() {
    let h = H::new();
    let player = h.player();

    player.stop();
    player.stop();

    assert_eq!(player.state(), PlaybackState::Idle);
    assert_eq!(h.resets(), 0);
}

fn rapid_toggling_ends_idle<H: Harness>() {
    let h = H::new();
    let player = h.player();

    for _ in 0..5 {
        player.play();
        player.stop();
    }

    assert_eq!(player.state(), PlaybackState::Idle);
    assert_eq!(h.connects(), 5);
    assert_eq!(h.resets(), 5);
}

fn stall_while_idle_is_a_no_op<H: Harness>() {
    let h = H::new();
    let player = h.player();

    h.stall();
    assert_eq!(player.state(), PlaybackState::Idle);

    player.play();
    h.stall();
    assert_eq!(player.state(), PlaybackState::Loading);
}

fn stall_while_playing_stalls<H: Harness>() {
    let h = H::new();
    let player = h.player();

    player.play();
    h.confirm();
    h.stall();

    assert_eq!(player.state(), PlaybackState::Stalled);
    assert!(!player.is_playing());
}

fn play_after_stall_recovers_on_fresh_connection<H: Harness>() {
    let h = H::new();
    let player = h.player();

    player.play();
    h.confirm();
    h.stall();

    player.play();
    assert_eq!(player.state(), PlaybackState::Loading);
    assert_eq!(h.connects(), 2);

    h.confirm();
    assert_eq!(player.state(), PlaybackState::Playing);
}

fn redundant_tap_calls_are_safe<H: Harness>() {
    let h = H::new();
    let player = h.player();

    player.remove_render_tap();
    assert!(!player.is_render_tap_installed());

    player.install_render_tap();
    player.install_render_tap();
    assert!(player.is_render_tap_installed());

    player.remove_render_tap();
    player.remove_render_tap();
    assert!(!player.is_render_tap_installed());
    assert_eq!(player.state(), PlaybackState::Idle);
}

fn failure_returns_to_idle_with_error<H: Harness>() {
    let h = H::new();
    let player = h.player();

    player.play();
    h.confirm();
    h.fail(TransportError::Network("connection reset".into()));

    assert_eq!(player.state(), PlaybackState::Idle);
    assert_eq!(
        h.analytics().stream_errors(),
        vec![(bridge_traits::StreamErrorType::NetworkError, 0)]
    );

    // Always recoverable by a fresh play.
    player.play();
    h.confirm();
    assert_eq!(player.state(), PlaybackState::Playing);
}

async fn state_stream_preserves_order<H: Harness>() {
    let h = H::new();
    let player = h.player();
    let mut states = player.state_stream();

    player.play();
    h.confirm();
    h.stall();
    player.stop();

    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(states.next().await.unwrap());
    }
    assert_eq!(
        seen,
        vec![
            PlaybackState::Loading,
            PlaybackState::Playing,
            PlaybackState::Stalled,
            PlaybackState::Idle,
        ]
    );
}

async fn event_stream_reports_stall_then_recovery<H: Harness>() {
    let h = H::new();
    let player = h.player();
    let mut events = player.event_stream();

    player.play();
    h.confirm();
    h.stall();
    player.play();
    h.confirm();

    assert_eq!(events.next().await, Some(PlayerEvent::Stall));
    assert_eq!(events.next().await, Some(PlayerEvent::Recovery));
}

async fn transport_events_arrive_through_pump<H: Harness>() {
    let h = H::new();
    let player = h.player();

    player.play();
    h.post_confirm();
    assert!(wait_for_state(player.as_ref(), PlaybackState::Playing).await);
}

macro_rules! conformance_suite {
    ($module:ident, $harness:ty) => {
        mod $module {
            use super::*;

            #[tokio::test]
            async fn play_reaches_playing() {
                super::play_reaches_playing::<$harness>();
            }

            #[tokio::test]
            async fn stop_never_records_stopped() {
                super::stop_never_records_stopped::<$harness>();
            }

            #[tokio::test]
            async fn stop_resets_connection_once_per_stop() {
                super::stop_resets_connection_once_per_stop::<$harness>();
            }

            #[tokio::test]
            async fn repeated_play_is_idempotent() {
                super::repeated_play_is_idempotent::<$harness>();
            }

            #[tokio::test]
            async fn repeated_stop_while_idle_is_safe() {
                super::repeated_stop_while_idle_is_safe::<$harness>();
            }

            #[tokio::test]
            async fn rapid_toggling_ends_idle() {
                super::rapid_toggling_ends_idle::<$harness>();
            }

            #[tokio::test]
            async fn stall_while_idle_is_a_no_op() {
                super::stall_while_idle_is_a_no_op::<$harness>();
            }

            #[tokio::test]
            async fn stall_while_playing_stalls() {
                super::stall_while_playing_stalls::<$harness>();
            }

            #[tokio::test]
            async fn play_after_stall_recovers_on_fresh_connection() {
                super::play_after_stall_recovers_on_fresh_connection::<$harness>();
            }

            #[tokio::test]
            async fn redundant_tap_calls_are_safe() {
                super::redundant_tap_calls_are_safe::<$harness>();
            }

            #[tokio::test]
            async fn failure_returns_to_idle_with_error() {
                super::failure_returns_to_idle_with_error::<$harness>();
            }

            #[tokio::test]
            async fn state_stream_preserves_order() {
                super::state_stream_preserves_order::<$harness>().await;
            }

            #[tokio::test]
            async fn event_stream_reports_stall_then_recovery() {
                super::event_stream_reports_stall_then_recovery::<$harness>().await;
            }

            #[tokio::test]
            async fn transport_events_arrive_through_pump() {
                super::transport_events_arrive_through_pump::<$harness>().await;
            }
        }
    };
}

conformance_suite!(native_engine, NativeHarness);
conformance_suite!(buffered_stream, BufferedHarness);
