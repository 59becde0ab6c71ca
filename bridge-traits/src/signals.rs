//! System signals consumed by the playback controller.
//!
//! Platforms deliver audio interruptions, output route changes and app
//! lifecycle transitions through their own notification mechanisms
//! (NotificationCenter, BroadcastReceiver, Page Visibility). Hosts translate
//! them into [`SystemSignal`] values and publish them through a
//! [`SignalSource`], which the controller subscribes to.
//!
//! # Example
//!
//! ```ignore
//! use bridge_traits::signals::{SignalSource, SystemSignal};
//!
//! async fn watch(source: &dyn SignalSource) -> bridge_traits::error::Result<()> {
//!     let mut stream = source.subscribe().await?;
//!     while let Some(signal) = stream.next().await {
//!         if let SystemSignal::InterruptionBegan { .. } = signal {
//!             // stop playback
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Why the audio output route changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteChangeReason {
    /// The previous output device went away (headphones unplugged,
    /// Bluetooth disconnected).
    OldDeviceUnavailable,
    /// A new output device became available.
    NewDeviceAvailable,
    /// The route configuration changed without a device change.
    RouteConfigurationChange,
    /// The session category changed.
    CategoryChange,
    /// The route was overridden (e.g. forced to the speaker).
    Override,
}

impl RouteChangeReason {
    /// Returns `true` if the change means the listener lost their output
    /// device and playback should stop.
    pub fn is_device_loss(&self) -> bool {
        matches!(self, RouteChangeReason::OldDeviceUnavailable)
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
    /// Application is in the foreground and active
    Foreground,
    /// Application is in the background
    Background,
    /// Application is being suspended
    Suspended,
}

/// A system notification relevant to playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SystemSignal {
    /// Another process took the audio output (incoming call, alarm).
    InterruptionBegan { should_resume: bool },
    /// The interruption ended; `should_resume` is the platform's hint that
    /// playback may continue.
    InterruptionEnded { should_resume: bool },
    /// The output route changed.
    RouteChanged { reason: RouteChangeReason },
    /// The app moved between foreground and background.
    Lifecycle { state: LifecycleState },
}

/// Source of [`SystemSignal`]s.
///
/// Each call to `subscribe` returns an independent stream that sees signals
/// published after the call. Earlier signals are not replayed.
#[async_trait::async_trait]
pub trait SignalSource: Send + Sync {
    /// Subscribe to future system signals.
    async fn subscribe(&self) -> Result<Box<dyn SignalStream>>;
}

/// Stream of system signals.
#[async_trait::async_trait]
pub trait SignalStream: Send {
    /// Get the next signal.
    ///
    /// Returns `None` when the source has shut down.
    async fn next(&mut self) -> Option<SystemSignal>;
}
