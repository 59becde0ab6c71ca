//! # Playback Configuration Module
//!
//! Provides configuration for the live-stream playback core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`PlaybackConfig`]. The builder enforces fail-fast validation so a
//! misconfigured stream URL or an impossible backoff schedule is rejected
//! before any transport is touched.
//!
//! ## Sections
//!
//! - [`BackoffConfig`] - Stall reconnection timing
//! - [`BufferingConfig`] - Ring buffer sizing for the buffered stream backend
//! - [`PlayerBackend`] - Which transport wrapper drives playback
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::{PlaybackConfig, PlayerBackend};
//! use std::time::Duration;
//!
//! let config = PlaybackConfig::builder()
//!     .stream_url("https://radio.example.com/live.mp3")
//!     .backend(PlayerBackend::BufferedStream)
//!     .initial_wait_time(Duration::from_millis(250))
//!     .maximum_attempts(5)
//!     .build()?;
//!
//! assert_eq!(config.backoff.maximum_attempts, 5);
//! # Ok::<(), core_runtime::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! ```
//! use core_runtime::config::PlaybackConfig;
//!
//! let result = PlaybackConfig::builder().build();
//! assert!(result.unwrap_err().to_string().contains("Stream URL is required"));
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transport wrapper used to play the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerBackend {
    /// Platform media engine; infers "playing" from rate changes.
    #[default]
    NativeEngine,
    /// Network streaming engine feeding a local ring buffer.
    BufferedStream,
}

// ============================================================================
// Backoff
// ============================================================================

/// Reconnection timing applied after a stall.
///
/// The delay before reconnect attempt `n` is
/// `min(initial_wait_time * 2^n, maximum_wait_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first reconnect attempt.
    ///
    /// Default: 500ms.
    #[serde(default = "default_initial_wait_time")]
    pub initial_wait_time: Duration,

    /// Upper bound for any single delay.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_maximum_wait_time")]
    pub maximum_wait_time: Duration,

    /// Reconnect attempts before giving up until the user retries.
    ///
    /// Default: 10.
    #[serde(default = "default_maximum_attempts")]
    pub maximum_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_wait_time: default_initial_wait_time(),
            maximum_wait_time: default_maximum_wait_time(),
            maximum_attempts: default_maximum_attempts(),
        }
    }
}

impl BackoffConfig {
    pub fn new(
        initial_wait_time: Duration,
        maximum_wait_time: Duration,
        maximum_attempts: u32,
    ) -> Self {
        Self {
            initial_wait_time,
            maximum_wait_time,
            maximum_attempts,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.maximum_attempts == 0 {
            return Err(Error::Config(
                "maximum_attempts must be at least 1".to_string(),
            ));
        }

        if self.initial_wait_time > self.maximum_wait_time {
            return Err(Error::Config(format!(
                "initial_wait_time ({:?}) cannot exceed maximum_wait_time ({:?})",
                self.initial_wait_time, self.maximum_wait_time
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Buffering
// ============================================================================

/// Ring buffer sizing for the buffered stream backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferingConfig {
    /// Ring buffer capacity in frames (one frame = one sample per channel).
    ///
    /// Default: 2 seconds at 44.1kHz (88200 frames).
    #[serde(default = "default_buffer_frames")]
    pub buffer_frames: usize,

    /// Frames that must be buffered before playback starts or resumes.
    ///
    /// Default: 0.5 seconds (22050 frames).
    #[serde(default = "default_min_buffered_frames")]
    pub min_buffered_frames: usize,

    /// Interleaved channel count of decoded audio.
    ///
    /// Default: 2.
    #[serde(default = "default_channels")]
    pub channels: u16,
}

impl Default for BufferingConfig {
    fn default() -> Self {
        Self {
            buffer_frames: default_buffer_frames(),
            min_buffered_frames: default_min_buffered_frames(),
            channels: default_channels(),
        }
    }
}

impl BufferingConfig {
    /// Smaller buffer, faster start, more stalls on poor networks.
    pub fn low_latency() -> Self {
        Self {
            buffer_frames: 22050,       // 0.5s at 44.1kHz
            min_buffered_frames: 11025, // 0.25s
            ..Default::default()
        }
    }

    /// Larger buffer that rides out longer network gaps.
    pub fn high_quality() -> Self {
        Self {
            buffer_frames: 220500,      // 5s at 44.1kHz
            min_buffered_frames: 88200, // 2s
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_frames == 0 {
            return Err(Error::Config("buffer_frames must be > 0".to_string()));
        }

        if self.channels == 0 {
            return Err(Error::Config("channels must be > 0".to_string()));
        }

        if self.min_buffered_frames > self.buffer_frames {
            return Err(Error::Config(
                "min_buffered_frames cannot exceed buffer_frames".to_string(),
            ));
        }

        Ok(())
    }

    /// Ring buffer capacity in interleaved samples.
    pub fn buffer_samples(&self) -> usize {
        self.buffer_frames * self.channels as usize
    }

    /// Start threshold in interleaved samples.
    pub fn min_buffer_samples(&self) -> usize {
        self.min_buffered_frames * self.channels as usize
    }
}

fn default_initial_wait_time() -> Duration {
    Duration::from_millis(500)
}

fn default_maximum_wait_time() -> Duration {
    Duration::from_secs(10)
}

fn default_maximum_attempts() -> u32 {
    10
}

fn default_buffer_frames() -> usize {
    88200 // 2 seconds at 44.1kHz
}

fn default_min_buffered_frames() -> usize {
    22050 // 0.5 seconds at 44.1kHz
}

fn default_channels() -> u16 {
    2
}

fn default_reset_backoff_on_stop() -> bool {
    true
}

// ============================================================================
// Playback configuration
// ============================================================================

/// Complete configuration for one playback core instance.
///
/// Use [`PlaybackConfigBuilder`] to construct instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Live stream URL (http or https).
    pub stream_url: String,

    #[serde(default)]
    pub backend: PlayerBackend,

    #[serde(default)]
    pub backoff: BackoffConfig,

    #[serde(default)]
    pub buffering: BufferingConfig,

    /// Whether an explicit stop resets the reconnect attempt counter.
    ///
    /// When false, only a confirmed return to playing (or a manual play
    /// after the attempts ran out) clears it.
    #[serde(default = "default_reset_backoff_on_stop")]
    pub reset_backoff_on_stop: bool,
}

impl PlaybackConfig {
    /// Creates a new builder.
    pub fn builder() -> PlaybackConfigBuilder {
        PlaybackConfigBuilder::default()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_stream_url(&self.stream_url)?;
        self.backoff.validate()?;
        self.buffering.validate()?;
        Ok(())
    }
}

fn validate_stream_url(url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| Error::InvalidStreamUrl(format!("{url} (expected http:// or https://)")))?;

    if rest.is_empty() || rest.starts_with('/') {
        return Err(Error::InvalidStreamUrl(format!("{url} (missing host)")));
    }

    Ok(())
}

/// Builder for constructing [`PlaybackConfig`] instances.
#[derive(Debug, Default)]
pub struct PlaybackConfigBuilder {
    stream_url: Option<String>,
    backend: PlayerBackend,
    backoff: BackoffConfig,
    buffering: BufferingConfig,
    reset_backoff_on_stop: Option<bool>,
}

impl PlaybackConfigBuilder {
    /// Sets the live stream URL.
    pub fn stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    pub fn backend(mut self, backend: PlayerBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Replaces the whole backoff section.
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn initial_wait_time(mut self, wait: Duration) -> Self {
        self.backoff.initial_wait_time = wait;
        self
    }

    pub fn maximum_wait_time(mut self, wait: Duration) -> Self {
        self.backoff.maximum_wait_time = wait;
        self
    }

    pub fn maximum_attempts(mut self, attempts: u32) -> Self {
        self.backoff.maximum_attempts = attempts;
        self
    }

    /// Replaces the whole buffering section.
    pub fn buffering(mut self, buffering: BufferingConfig) -> Self {
        self.buffering = buffering;
        self
    }

    pub fn min_buffered_frames(mut self, frames: usize) -> Self {
        self.buffering.min_buffered_frames = frames;
        self
    }

    pub fn reset_backoff_on_stop(mut self, reset: bool) -> Self {
        self.reset_backoff_on_stop = Some(reset);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the stream URL is missing or a section is invalid
    /// - [`Error::InvalidStreamUrl`] if the URL is not http(s)
    pub fn build(self) -> Result<PlaybackConfig> {
        let stream_url = self.stream_url.ok_or_else(|| {
            Error::Config("Stream URL is required. Use .stream_url() to set it.".to_string())
        })?;

        let config = PlaybackConfig {
            stream_url,
            backend: self.backend,
            backoff: self.backoff,
            buffering: self.buffering,
            reset_backoff_on_stop: self
                .reset_backoff_on_stop
                .unwrap_or_else(default_reset_backoff_on_stop),
        };

        config.validate()?;

        Ok(config)
    }
}
