//! # Host Bridge Traits
//!
//! Capability contracts the live-stream playback core needs from its host.
//!
//! ## Overview
//!
//! The playback core coordinates user commands, system notifications and
//! transport events, but it never talks to a platform API directly. Each trait
//! in this crate is one capability the host must (or may) provide:
//!
//! ### Audio output
//! - [`AudioSession`](session::AudioSession) - Process-wide audio session activation
//! - [`EngineTransport`](transport::EngineTransport) - Native media engine wrapper
//! - [`StreamTransport`](transport::StreamTransport) - Buffered network streaming engine
//!
//! ### Platform integration
//! - [`SignalSource`](signals::SignalSource) - Interruptions, route changes, lifecycle
//!
//! ### Reporting
//! - [`AnalyticsSink`](analytics::AnalyticsSink) - Play/stop/error analytics
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! Fallible bridge calls return [`BridgeError`](error::BridgeError). Transport
//! failures are not returned from calls; transports report them
//! asynchronously as [`TransportEvent::Failed`](transport::TransportEvent).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`. Transports and signal sources call
//! back from arbitrary threads; the core marshals those callbacks onto its own
//! serialized context.

pub mod analytics;
pub mod error;
pub mod logging;
pub mod session;
pub mod signals;
pub mod transport;

pub use error::BridgeError;

// Re-export commonly used types
pub use analytics::{
    AnalyticsEvent, AnalyticsSink, PlaybackMarker, PlayerType, RecoveryMethod, StreamErrorType,
};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use session::{AudioSession, PlaybackSessionId};
pub use signals::{LifecycleState, RouteChangeReason, SignalSource, SignalStream, SystemSignal};
pub use transport::{
    transport_channel, AudioFrameChunk, EngineTransport, StreamTransport, TransportError,
    TransportEvent, TransportEventReceiver, TransportEventSender,
};
