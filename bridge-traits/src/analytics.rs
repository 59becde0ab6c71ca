//! Analytics capture contract.
//!
//! The core reports every play, stop, stall outcome and stream failure to a
//! host-provided [`AnalyticsSink`]. Events are emitted, never stored, by the
//! core. Hosts forward them to their analytics backend (PostHog, Firebase,
//! a log file).
//!
//! ## Call contract
//!
//! - `Started` carries the exact reason string supplied by the caller.
//! - `Stopped` is only emitted from controller-mediated stop paths. A stop
//!   issued directly on a player never emits it. A user toggle carries
//!   `reason: None`; interruption, route and stall stops carry a reason.
//! - `StreamError` describes a failure and how the core reacted to it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which backend produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerType {
    /// Platform media engine wrapper.
    NativeEngine,
    /// Buffered network streaming engine.
    BufferedStream,
}

impl PlayerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerType::NativeEngine => "native_engine",
            PlayerType::BufferedStream => "buffered_stream",
        }
    }
}

/// Error taxonomy reported in [`AnalyticsEvent::StreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamErrorType {
    /// I/O or connectivity failure.
    NetworkError,
    /// Transport or decode failure.
    PlayerError,
    /// Repeated stall recovery failed `maximum_attempts` times.
    BackoffExhausted,
}

/// How the core responded to a stream error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecoveryMethod {
    /// Automatic reconnection with exponential backoff.
    RetryWithBackoff,
    /// Playback stopped; the user has to press play again.
    ManualRetry,
}

/// Backend-specific marker events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "marker", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PlaybackMarker {
    /// `play()` arrived while already loading or playing and was ignored.
    AlreadyPlaying,
    /// The backend refilled its buffer and resumed on its own.
    StallRecovered { stall_duration: Duration },
}

/// Analytics event emitted by the playback core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AnalyticsEvent {
    /// Playback was requested.
    Started { reason: Option<String> },
    /// Playback was stopped through the controller.
    Stopped {
        reason: Option<String>,
        /// Time since the most recent successful `play`.
        duration: Duration,
    },
    /// A stream failure and the recovery applied.
    StreamError {
        error_type: StreamErrorType,
        recovery_method: RecoveryMethod,
        player_type: PlayerType,
        session_duration: Duration,
        stall_duration: Option<Duration>,
        reconnect_attempts: u32,
    },
    /// Backend-specific marker.
    PlaybackMarker {
        marker: PlaybackMarker,
        player_type: PlayerType,
    },
}

impl AnalyticsEvent {
    /// Short event name, suitable as an analytics event key.
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::Started { .. } => "playback_started",
            AnalyticsEvent::Stopped { .. } => "playback_stopped",
            AnalyticsEvent::StreamError { .. } => "stream_error",
            AnalyticsEvent::PlaybackMarker { .. } => "playback_marker",
        }
    }
}

/// Host analytics sink.
///
/// `capture` is called synchronously from the core's serialized context and
/// must not call back into the controller or player. Implementations that
/// talk to the network should hand the event off to their own queue.
pub trait AnalyticsSink: Send + Sync {
    fn capture(&self, event: AnalyticsEvent);
}
