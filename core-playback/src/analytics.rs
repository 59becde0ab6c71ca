//! Analytics capture.
//!
//! [`Analytics`] is the handle players and the controller record through.
//! It tolerates a missing sink: with no sink configured every capture is a
//! no-op.

use bridge_traits::{
    AnalyticsEvent, AnalyticsSink, PlaybackMarker, PlayerType, RecoveryMethod, StreamErrorType,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Optional analytics sink with typed capture helpers.
#[derive(Clone, Default)]
pub struct Analytics {
    sink: Option<Arc<dyn AnalyticsSink>>,
}

impl Analytics {
    pub fn new(sink: Option<Arc<dyn AnalyticsSink>>) -> Self {
        Self { sink }
    }

    /// Handle that drops every event.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn capture(&self, event: AnalyticsEvent) {
        debug!(event = event.name(), "Capturing analytics event");
        if let Some(sink) = &self.sink {
            sink.capture(event);
        }
    }

    /// Records a play request with the caller's reason, unmodified.
    pub fn started(&self, reason: impl Into<String>) {
        self.capture(AnalyticsEvent::Started {
            reason: Some(reason.into()),
        });
    }

    /// Records the end of a listening session.
    ///
    /// `None` means the user stopped playback directly.
    pub fn stopped(&self, reason: Option<&str>, duration: Duration) {
        self.capture(AnalyticsEvent::Stopped {
            reason: reason.map(str::to_owned),
            duration,
        });
    }

    pub fn stream_error(
        &self,
        error_type: StreamErrorType,
        recovery_method: RecoveryMethod,
        player_type: PlayerType,
        session_duration: Duration,
        stall_duration: Option<Duration>,
        reconnect_attempts: u32,
    ) {
        self.capture(AnalyticsEvent::StreamError {
            error_type,
            recovery_method,
            player_type,
            session_duration,
            stall_duration,
            reconnect_attempts,
        });
    }

    pub fn marker(&self, marker: PlaybackMarker, player_type: PlayerType) {
        self.capture(AnalyticsEvent::PlaybackMarker {
            marker,
            player_type,
        });
    }
}

impl fmt::Debug for Analytics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analytics")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Sink that writes each event as a JSON `info!` record.
///
/// Useful as a default when the host has no analytics pipeline yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingAnalyticsSink;

impl AnalyticsSink for LoggingAnalyticsSink {
    fn capture(&self, event: AnalyticsEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(target: "analytics", event = event.name(), %payload),
            Err(err) => warn!(
                event = event.name(),
                error = %err,
                "Failed to encode analytics event"
            ),
        }
    }
}
