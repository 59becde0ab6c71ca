//! # Live Stream Playback Core
//!
//! Playback control for a live internet audio broadcast.
//!
//! ## Overview
//!
//! This crate handles:
//! - One [`AudioPlayer`] contract implemented by two transports: the native
//!   media engine ([`NativeEnginePlayer`]) and a buffered network stream
//!   ([`BufferedStreamPlayer`])
//! - Stall detection and reconnection with capped exponential backoff
//!   ([`BackoffPolicy`])
//! - Session policy for interruptions, route changes and app lifecycle
//!   ([`PlaybackController`])
//! - Analytics capture for play/stop/error events ([`Analytics`])
//!
//! A live stream never resumes stale audio: stopping always tears down the
//! connection, so the next play joins the live edge.

pub mod analytics;
pub mod backoff;
pub mod buffered;
pub mod controller;
pub mod error;
pub mod native;
pub mod player;
pub mod ring_buffer;

pub use analytics::{Analytics, LoggingAnalyticsSink};
pub use backoff::BackoffPolicy;
pub use buffered::BufferedStreamPlayer;
pub use controller::{ControllerOptions, PlaybackController};
pub use error::{PlaybackError, Result};
pub use native::NativeEnginePlayer;
pub use player::{AudioPlayer, PlaybackState, PlayerEvent, TransportEventHandler};
pub use ring_buffer::RingBuffer;
