//! Streaming transport bridge traits and supporting audio types.
//!
//! A transport is the low-level decode/render machinery of one backend: the
//! platform's native media engine, or a buffered network streaming engine
//! that hands decoded PCM to the core. The core treats each transport as a
//! black box that it commands synchronously and that reports back through a
//! [`TransportEventSender`].
//!
//! Transports call back from arbitrary threads (network I/O, hardware audio
//! callbacks). Events go through an unbounded channel so the sender never
//! blocks, and the owning player applies them one at a time, in the order they
//! were sent.

use crate::analytics::StreamErrorType;
use crate::error::Result;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Chunk of decoded PCM frames produced by a buffered transport.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrameChunk {
    /// Interleaved PCM samples in the range `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Number of frames represented by `samples` (frame = sample per channel).
    pub frames: usize,
    /// Presentation timestamp of the first frame, relative to connection start.
    pub timestamp: Duration,
}

impl AudioFrameChunk {
    /// Create a new audio frame chunk.
    pub fn new(samples: Vec<f32>, frames: usize, timestamp: Duration) -> Self {
        Self {
            samples,
            frames,
            timestamp,
        }
    }

    /// Build a chunk of silence with `frames` frames of `channels` channels.
    pub fn silence(frames: usize, channels: u16, timestamp: Duration) -> Self {
        Self::new(vec![0.0; frames * channels as usize], frames, timestamp)
    }

    /// Returns `true` if the chunk contains no sample data.
    pub fn is_empty(&self) -> bool {
        self.frames == 0 || self.samples.is_empty()
    }
}

/// Failure reported by a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connectivity failure (DNS, socket, HTTP status, URL loading).
    #[error("network failure: {0}")]
    Network(String),

    /// Local I/O failure while reading the stream.
    #[error("i/o failure: {0}")]
    Io(String),

    /// The stream could not be decoded.
    #[error("decoder failure: {0}")]
    Decoder(String),

    /// The audio engine or output device failed.
    #[error("audio device failure: {0}")]
    Device(String),
}

impl TransportError {
    /// Analytics classification: I/O and URL-domain failures are network
    /// errors, decode and engine failures are player errors.
    pub fn error_type(&self) -> StreamErrorType {
        match self {
            TransportError::Network(_) | TransportError::Io(_) => StreamErrorType::NetworkError,
            TransportError::Decoder(_) | TransportError::Device(_) => StreamErrorType::PlayerError,
        }
    }
}

/// Notification from a transport to its owning player.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Playback rate changed. A positive rate after `play()` means audio
    /// actually started flowing.
    RateChanged { rate: f32 },
    /// Decoded audio arrived from the network.
    Frames(AudioFrameChunk),
    /// The transport ran out of audio while playing.
    Stalled,
    /// The transport failed; the current item or connection is unusable.
    Failed(TransportError),
}

/// Receiving half of a transport event channel, owned by the player.
pub type TransportEventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Sending half handed to a transport via `attach`.
#[derive(Debug, Clone)]
pub struct TransportEventSender {
    inner: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportEventSender {
    /// Post an event to the player. Returns `false` once the player is gone.
    pub fn send(&self, event: TransportEvent) -> bool {
        self.inner.send(event).is_ok()
    }

    /// Returns `true` if the owning player has been dropped.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Create a connected sender/receiver pair.
pub fn transport_channel() -> (TransportEventSender, TransportEventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TransportEventSender { inner: tx }, rx)
}

/// Native media engine wrapper (AVPlayer, ExoPlayer, MediaPlayer).
///
/// The engine owns decoding, buffering and output internally; the core only
/// swaps the current item and toggles the rate. It has no buffer-level access.
pub trait EngineTransport: Send + Sync {
    /// Register the channel used to report [`TransportEvent`]s. Called once by
    /// the player at construction.
    fn attach(&self, events: TransportEventSender);

    /// Replace the current item with a fresh live item for `url`.
    fn load(&self, url: &str);

    /// Start (or resume) the engine.
    fn play(&self);

    /// Pause the engine without releasing the item.
    fn pause(&self);

    /// Replace the current item with nothing, dropping all buffered audio.
    fn unload(&self);

    /// Install the audio-processing tap on the current output.
    fn install_tap(&self) -> Result<()>;

    /// Remove the audio-processing tap.
    fn remove_tap(&self);
}

/// Buffered network streaming engine that delivers decoded PCM to the core.
///
/// Decoded audio arrives as [`TransportEvent::Frames`]; the core buffers it
/// and feeds the hardware render callback itself.
pub trait StreamTransport: Send + Sync {
    /// Register the channel used to report [`TransportEvent`]s.
    fn attach(&self, events: TransportEventSender);

    /// Open a fresh connection to `url`, replacing any existing one.
    fn connect(&self, url: &str);

    /// Close the current connection and discard in-flight data.
    fn disconnect(&self);
}
