//! Shared audio session abstraction.
//!
//! The audio output session (AVAudioSession on Apple platforms, audio focus on
//! Android) is a single process-wide resource. Other applications may be
//! playing through it at the same time, so the core only deactivates a session
//! it activated itself.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Host-provided handle to the process-wide audio session.
///
/// Both calls are synchronous: platform session APIs return immediately and
/// report failure inline.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::session::AudioSession;
///
/// struct AvAudioSession;
///
/// impl AudioSession for AvAudioSession {
///     fn activate(&self) -> bridge_traits::error::Result<()> {
///         // setCategory(.playback) + setActive(true)
///         Ok(())
///     }
///
///     fn deactivate(&self) -> bridge_traits::error::Result<()> {
///         // setActive(false, options: .notifyOthersOnDeactivation)
///         Ok(())
///     }
/// }
/// ```
pub trait AudioSession: Send + Sync {
    /// Activate the session for playback. Calling it while already active
    /// must be harmless.
    fn activate(&self) -> Result<()>;

    /// Deactivate the session, letting other applications resume their audio.
    fn deactivate(&self) -> Result<()>;
}

/// Identifier attached to one controller play session (from a user-initiated
/// `play` until the matching stop). Used to correlate log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackSessionId(Uuid);

impl PlaybackSessionId {
    /// Generate a new session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PlaybackSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlaybackSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
