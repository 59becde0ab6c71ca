//! # System Signal Bus
//!
//! Delivers OS-level playback signals (interruptions, route changes,
//! lifecycle transitions) to the playback core through `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! Platform adapters translate native notifications into
//! [`SystemSignal`] values and [`emit`](EventBus::emit) them. The playback
//! controller never observes the platform directly; it subscribes through the
//! [`SignalSource`] implementation on [`EventBus`], so tests drive the exact
//! same path with a bus they own.
//!
//! ```text
//! ┌──────────────────┐  emit   ┌──────────┐  subscribe  ┌────────────────────┐
//! │ Platform adapter ├────────>│ EventBus ├────────────>│ PlaybackController │
//! └──────────────────┘         └──────────┘             └────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use bridge_traits::{RouteChangeReason, SystemSignal};
//! use core_runtime::events::EventBus;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut subscriber = bus.subscribe();
//!
//! bus.emit(SystemSignal::RouteChanged {
//!     reason: RouteChangeReason::OldDeviceUnavailable,
//! })
//! .ok();
//!
//! let signal = subscriber.recv().await.unwrap();
//! assert!(matches!(signal, SystemSignal::RouteChanged { .. }));
//! # }
//! ```

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{SignalSource, SignalStream, SystemSignal};
use std::fmt;
use tokio::sync::broadcast::{self, error::RecvError, error::SendError, Receiver};
use tracing::warn;

/// Default buffer size for the signal bus.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast bus for [`SystemSignal`]s.
///
/// Cloning the bus yields another producer for the same channel. Each
/// `subscribe()` creates an independent receiver that observes signals
/// emitted after the call; earlier signals are not replayed.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SystemSignal>,
}

impl EventBus {
    /// Creates a new bus with the specified per-subscriber buffer.
    ///
    /// A subscriber that falls behind by more than `capacity` signals
    /// receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes a signal to all subscribers.
    ///
    /// Returns the number of subscribers that received it, or an error if
    /// nobody is listening.
    pub fn emit(&self, signal: SystemSignal) -> Result<usize, SendError<SystemSignal>> {
        self.sender.send(signal)
    }

    pub fn subscribe(&self) -> Receiver<SystemSignal> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[async_trait]
impl SignalSource for EventBus {
    async fn subscribe(&self) -> BridgeResult<Box<dyn SignalStream>> {
        Ok(Box::new(BusSignalStream {
            inner: EventStream::new(self.sender.subscribe()),
        }))
    }
}

/// [`SignalStream`] over a bus receiver.
///
/// Lagged receivers skip the lost signals and keep going; the stream ends
/// when every bus handle has been dropped.
struct BusSignalStream {
    inner: EventStream,
}

#[async_trait]
impl SignalStream for BusSignalStream {
    async fn next(&mut self) -> Option<SystemSignal> {
        loop {
            match self.inner.recv().await {
                Ok(signal) => return Some(signal),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Signal subscriber lagged; dropping missed signals");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for signal filter functions.
type SignalFilter = Box<dyn Fn(&SystemSignal) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter predicate.
///
/// ```rust
/// use bridge_traits::SystemSignal;
/// use core_runtime::events::{EventBus, EventStream};
///
/// let bus = EventBus::default();
/// let interruptions = EventStream::new(bus.subscribe()).filter(|signal| {
///     matches!(
///         signal,
///         SystemSignal::InterruptionBegan { .. } | SystemSignal::InterruptionEnded { .. }
///     )
/// });
/// # drop(interruptions);
/// ```
pub struct EventStream {
    receiver: Receiver<SystemSignal>,
    filter: Option<SignalFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<SystemSignal>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only signals matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&SystemSignal) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, signal: &SystemSignal) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(signal))
    }

    /// Receives the next signal that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` signals.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<SystemSignal, RecvError> {
        loop {
            let signal = self.receiver.recv().await?;
            if self.accepts(&signal) {
                return Ok(signal);
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
