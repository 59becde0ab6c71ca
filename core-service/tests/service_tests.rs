//! CoreService bootstrap tests.

use bridge_traits::{
    AnalyticsEvent, AnalyticsSink, AudioSession, EngineTransport, LifecycleState, PlayerType,
    RouteChangeReason, StreamTransport, SystemSignal, TransportEventSender,
};
use core_playback::PlaybackState;
use core_runtime::config::{PlaybackConfig, PlayerBackend};
use core_runtime::events::EventBus;
use core_service::{CoreDependencies, CoreError, CoreService, TransportBinding};
use mockall::mock;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Session {}

    impl AudioSession for Session {
        fn activate(&self) -> bridge_traits::error::Result<()>;
        fn deactivate(&self) -> bridge_traits::error::Result<()>;
    }
}

#[derive(Default)]
struct NullEngine;

impl EngineTransport for NullEngine {
    fn attach(&self, _events: TransportEventSender) {}
    fn load(&self, _url: &str) {}
    fn play(&self) {}
    fn pause(&self) {}
    fn unload(&self) {}
    fn install_tap(&self) -> bridge_traits::error::Result<()> {
        Ok(())
    }
    fn remove_tap(&self) {}
}

#[derive(Default)]
struct NullStream;

impl StreamTransport for NullStream {
    fn attach(&self, _events: TransportEventSender) {}
    fn connect(&self, _url: &str) {}
    fn disconnect(&self) {}
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl AnalyticsSink for Recorder {
    fn capture(&self, event: AnalyticsEvent) {
        self.events.lock().push(event);
    }
}

fn session() -> Arc<MockSession> {
    let mut session = MockSession::new();
    session.expect_activate().returning(|| Ok(()));
    session.expect_deactivate().returning(|| Ok(()));
    Arc::new(session)
}

fn config(backend: PlayerBackend) -> PlaybackConfig {
    PlaybackConfig::builder()
        .stream_url("https://radio.example.com/live.mp3")
        .backend(backend)
        .build()
        .unwrap()
}

async fn eventually<F: FnMut() -> bool>(mut condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_builds_native_engine_backend() {
    let deps = CoreDependencies::new(
        TransportBinding::NativeEngine(Arc::new(NullEngine)),
        session(),
    );

    let core = CoreService::new(config(PlayerBackend::NativeEngine), deps)
        .await
        .unwrap();

    assert_eq!(
        core.controller().player().player_type(),
        PlayerType::NativeEngine
    );
    assert_eq!(core.controller().state(), PlaybackState::Idle);
}

#[tokio::test]
async fn test_builds_buffered_stream_backend() {
    let deps = CoreDependencies::new(
        TransportBinding::BufferedStream(Arc::new(NullStream)),
        session(),
    );

    let core = CoreService::new(config(PlayerBackend::BufferedStream), deps)
        .await
        .unwrap();

    assert_eq!(
        core.controller().player().player_type(),
        PlayerType::BufferedStream
    );
}

#[tokio::test]
async fn test_rejects_mismatched_transport() {
    let deps = CoreDependencies::new(
        TransportBinding::NativeEngine(Arc::new(NullEngine)),
        session(),
    );

    let result = CoreService::new(config(PlayerBackend::BufferedStream), deps).await;

    assert!(matches!(result, Err(CoreError::CapabilityMissing { .. })));
}

#[tokio::test]
async fn test_rejects_invalid_config() {
    let mut config = config(PlayerBackend::NativeEngine);
    config.backoff.maximum_attempts = 0;
    let deps = CoreDependencies::new(
        TransportBinding::NativeEngine(Arc::new(NullEngine)),
        session(),
    );

    let result = CoreService::new(config, deps).await;

    assert!(matches!(result, Err(CoreError::Config(_))));
}

#[tokio::test]
async fn test_analytics_flow_to_host_sink() {
    let recorder = Arc::new(Recorder::default());
    let deps = CoreDependencies::new(
        TransportBinding::NativeEngine(Arc::new(NullEngine)),
        session(),
    )
    .with_analytics(recorder.clone());

    let core = CoreService::new(config(PlayerBackend::NativeEngine), deps)
        .await
        .unwrap();
    core.controller().play("user tapped play").unwrap();

    assert_eq!(
        recorder.events.lock().first(),
        Some(&AnalyticsEvent::Started {
            reason: Some("user tapped play".to_string())
        })
    );
}

#[tokio::test]
async fn test_signal_source_is_wired() {
    let bus = Arc::new(EventBus::new(16));
    let recorder = Arc::new(Recorder::default());
    let deps = CoreDependencies::new(
        TransportBinding::NativeEngine(Arc::new(NullEngine)),
        session(),
    )
    .with_analytics(recorder.clone())
    .with_signal_source(bus.clone());

    let core = CoreService::new(config(PlayerBackend::NativeEngine), deps)
        .await
        .unwrap();
    core.controller().play("user tapped play").unwrap();

    bus.emit(SystemSignal::RouteChanged {
        reason: RouteChangeReason::OldDeviceUnavailable,
    })
    .unwrap();

    assert!(eventually(|| !core.controller().playback_intended()).await);
    assert!(recorder.events.lock().iter().any(|event| matches!(
        event,
        AnalyticsEvent::Stopped { reason: Some(reason), .. } if reason == "route disconnected"
    )));
}

#[tokio::test]
async fn test_shutdown_stops_playback_and_signals() {
    let bus = Arc::new(EventBus::new(16));
    let deps = CoreDependencies::new(
        TransportBinding::NativeEngine(Arc::new(NullEngine)),
        session(),
    )
    .with_signal_source(bus.clone());

    let core = CoreService::new(config(PlayerBackend::NativeEngine), deps)
        .await
        .unwrap();
    core.controller().play("user tapped play").unwrap();
    core.controller().install_render_tap();

    core.shutdown();
    assert_eq!(core.controller().state(), PlaybackState::Idle);
    assert!(!core.controller().playback_intended());

    // Signals are no longer applied.
    let _ = bus.emit(SystemSignal::Lifecycle {
        state: LifecycleState::Background,
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(core.controller().player().is_render_tap_installed());

    core.shutdown();
}
