//! # Playback Error Types
//!
//! Errors surfaced by the playback control core.
//!
//! Transport failures are not returned from player calls; they are reported
//! asynchronously and become analytics plus a transition to idle. The
//! variants here cover what callers can observe synchronously.

use bridge_traits::{BridgeError, StreamErrorType, TransportError};
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The shared audio session refused to activate or deactivate.
    #[error("Audio session error: {0}")]
    AudioSession(#[source] BridgeError),

    /// Subscribing to system signals failed.
    #[error("Signal source error: {0}")]
    SignalSource(#[source] BridgeError),

    /// The transport reported a failure.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Network streaming failed.
    #[error("Streaming failed: {0}")]
    StreamingFailed(String),

    /// Stream source is unreachable (DNS, refused connection, 404).
    #[error("Audio source unavailable: {0}")]
    SourceUnavailable(String),

    /// Error occurred during audio decoding.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Stream buffer underrun occurred.
    #[error("Buffer underrun")]
    BufferUnderrun,

    #[error("Invalid playback configuration: {0}")]
    InvalidConfig(#[from] core_runtime::Error),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::StreamingFailed(_)
                | PlaybackError::BufferUnderrun
                | PlaybackError::SourceUnavailable(_)
                | PlaybackError::Transport(TransportError::Network(_))
                | PlaybackError::Transport(TransportError::Io(_))
        )
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        self.stream_error_type() == Some(StreamErrorType::NetworkError)
    }

    /// Analytics classification of this error, if it describes a stream failure.
    ///
    /// I/O and connectivity failures are network errors; decode and device
    /// failures are player errors. Session and configuration errors are not
    /// stream failures.
    pub fn stream_error_type(&self) -> Option<StreamErrorType> {
        match self {
            PlaybackError::Transport(err) => Some(err.error_type()),
            PlaybackError::StreamingFailed(_) | PlaybackError::SourceUnavailable(_) => {
                Some(StreamErrorType::NetworkError)
            }
            PlaybackError::DecodingError(_) | PlaybackError::BufferUnderrun => {
                Some(StreamErrorType::PlayerError)
            }
            PlaybackError::AudioSession(_)
            | PlaybackError::SignalSource(_)
            | PlaybackError::InvalidConfig(_)
            | PlaybackError::Internal(_) => None,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
