//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (audio session,
//! transport, analytics sink, system signal source) into the playback core.
//! Hosts build a [`PlaybackConfig`], bundle their bridges into
//! [`CoreDependencies`] and get back a ready [`CoreService`]:
//!
//! ```ignore
//! let config = PlaybackConfig::builder()
//!     .stream_url("https://radio.example.com/live.mp3")
//!     .build()?;
//!
//! let deps = CoreDependencies::new(
//!     TransportBinding::NativeEngine(Arc::new(AvPlayerTransport::new())),
//!     Arc::new(AvAudioSession),
//! )
//! .with_signal_source(Arc::new(NotificationCenterSignals::new()));
//!
//! let core = CoreService::new(config, deps).await?;
//! core.controller().play("user tapped play")?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{AnalyticsSink, AudioSession, EngineTransport, SignalSource, StreamTransport};
use core_playback::{
    Analytics, AudioPlayer, BufferedStreamPlayer, ControllerOptions, NativeEnginePlayer,
    PlaybackController,
};
use core_runtime::config::{PlaybackConfig, PlayerBackend};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Transport the host provides, matching one [`PlayerBackend`].
#[derive(Clone)]
pub enum TransportBinding {
    NativeEngine(Arc<dyn EngineTransport>),
    BufferedStream(Arc<dyn StreamTransport>),
}

impl TransportBinding {
    pub fn backend(&self) -> PlayerBackend {
        match self {
            TransportBinding::NativeEngine(_) => PlayerBackend::NativeEngine,
            TransportBinding::BufferedStream(_) => PlayerBackend::BufferedStream,
        }
    }
}

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub transport: TransportBinding,
    pub audio_session: Arc<dyn AudioSession>,
    /// Without a sink every analytics capture is a no-op.
    pub analytics: Option<Arc<dyn AnalyticsSink>>,
    /// Without a source the host calls the controller's signal handlers itself.
    pub signal_source: Option<Arc<dyn SignalSource>>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from the required bridges.
    pub fn new(transport: TransportBinding, audio_session: Arc<dyn AudioSession>) -> Self {
        Self {
            transport,
            audio_session,
            analytics: None,
            signal_source: None,
        }
    }

    pub fn with_analytics(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = Some(sink);
        self
    }

    pub fn with_signal_source(mut self, source: Arc<dyn SignalSource>) -> Self {
        self.signal_source = Some(source);
        self
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<PlaybackConfig>,
    controller: PlaybackController,
    signal_pump: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl CoreService {
    /// Validate `config`, build the configured backend and its controller,
    /// and subscribe to the signal source if one was provided.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Config`] if the configuration is invalid
    /// - [`CoreError::CapabilityMissing`] if the transport does not match
    ///   `config.backend`
    /// - [`CoreError::Playback`] if the signal subscription fails
    pub async fn new(config: PlaybackConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;

        let bound = deps.transport.backend();
        if bound != config.backend {
            return Err(CoreError::CapabilityMissing {
                capability: format!("{:?} transport", config.backend),
                message: format!(
                    "configured backend is {:?} but the host bound a {:?} transport",
                    config.backend, bound
                ),
            });
        }

        let analytics = Analytics::new(deps.analytics);
        let player: Arc<dyn AudioPlayer> = match deps.transport {
            TransportBinding::NativeEngine(transport) => NativeEnginePlayer::new(
                transport,
                config.stream_url.clone(),
                analytics.clone(),
            ),
            TransportBinding::BufferedStream(transport) => BufferedStreamPlayer::new(
                transport,
                config.stream_url.clone(),
                config.buffering,
                analytics.clone(),
            ),
        };

        let controller = PlaybackController::new(
            player,
            deps.audio_session,
            analytics,
            ControllerOptions::from(&config),
        );

        let signal_pump = match deps.signal_source {
            Some(source) => Some(controller.attach_signals(source).await?),
            None => None,
        };

        info!(
            backend = ?config.backend,
            signals = signal_pump.is_some(),
            "Playback core initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            controller,
            signal_pump: Arc::new(Mutex::new(signal_pump)),
        })
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Stop playback and stop listening to system signals.
    ///
    /// The service stays usable: playback can be started again, but signals
    /// are no longer applied automatically.
    pub fn shutdown(&self) {
        self.controller.stop();
        match self.signal_pump.lock().take() {
            Some(pump) => pump.abort(),
            None => debug!("No signal pump to stop"),
        }
        info!("Playback core shut down");
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("backend", &self.config.backend)
            .field("controller", &self.controller)
            .finish()
    }
}
