//! Live stream demo
//!
//! Drives a [`PlaybackController`] over the buffered backend with a simulated
//! network transport: the stream starts, underruns, gets reconnected with
//! backoff and is finally interrupted by a "phone call".
//!
//! Run with:
//! ```bash
//! RUST_LOG=core_playback=debug cargo run -p core-playback --example live_stream_demo
//! ```

use anyhow::Result;
use bridge_traits::{
    AudioFrameChunk, AudioSession, StreamTransport, SystemSignal, TransportEvent,
    TransportEventSender,
};
use core_playback::{
    Analytics, AudioPlayer, BufferedStreamPlayer, ControllerOptions, LoggingAnalyticsSink,
    PlaybackController, PlaybackState,
};
use core_runtime::config::{BufferingConfig, PlaybackConfig};
use core_runtime::events::EventBus;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Pretends to be a network engine: after `connect` it delivers silence
/// every 20ms until disconnected.
#[derive(Default)]
struct SimulatedStream {
    events: Mutex<Option<TransportEventSender>>,
    feeder: Mutex<Option<JoinHandle<()>>>,
}

impl StreamTransport for SimulatedStream {
    fn attach(&self, events: TransportEventSender) {
        *self.events.lock() = Some(events);
    }

    fn connect(&self, url: &str) {
        println!("   [transport] connect {url}");
        let Some(events) = self.events.lock().clone() else {
            return;
        };
        let feeder = tokio::spawn(async move {
            let mut timestamp = Duration::ZERO;
            loop {
                let chunk = AudioFrameChunk::silence(882, 2, timestamp);
                if !events.send(TransportEvent::Frames(chunk)) {
                    break;
                }
                timestamp += Duration::from_millis(20);
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        });
        if let Some(previous) = self.feeder.lock().replace(feeder) {
            previous.abort();
        }
    }

    fn disconnect(&self) {
        println!("   [transport] disconnect");
        if let Some(feeder) = self.feeder.lock().take() {
            feeder.abort();
        }
    }
}

struct DemoSession;

impl AudioSession for DemoSession {
    fn activate(&self) -> bridge_traits::error::Result<()> {
        println!("   [session] activate");
        Ok(())
    }

    fn deactivate(&self) -> bridge_traits::error::Result<()> {
        println!("   [session] deactivate");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))?;

    println!("=== Live Stream Demo ===\n");

    let config = PlaybackConfig::builder()
        .stream_url("https://radio.example.com/live.mp3")
        .initial_wait_time(Duration::from_millis(100))
        .maximum_wait_time(Duration::from_millis(400))
        .buffering(BufferingConfig::low_latency())
        .build()?;

    let analytics = Analytics::new(Some(Arc::new(LoggingAnalyticsSink)));
    let transport = Arc::new(SimulatedStream::default());
    let player = BufferedStreamPlayer::new(
        transport.clone(),
        config.stream_url.clone(),
        config.buffering,
        analytics.clone(),
    );
    let controller = PlaybackController::new(
        player.clone(),
        Arc::new(DemoSession),
        analytics,
        ControllerOptions::from(&config),
    );

    let bus = Arc::new(EventBus::default());
    let _signals = controller.attach_signals(bus.clone()).await?;

    let mut states = controller.state_stream();
    tokio::spawn(async move {
        while let Some(state) = states.next().await {
            println!("   [state] {}", state.as_str());
        }
    });

    println!("1. Play");
    controller.play("demo started")?;
    wait_until(&controller, PlaybackState::Playing).await;

    println!("\n2. Render callback drains faster than the network fills");
    let mut output = vec![0.0f32; player.buffering().buffer_samples()];
    let read = player.render(&mut output);
    println!("   rendered {read} samples, state {}", player.state().as_str());
    wait_until(&controller, PlaybackState::Playing).await;
    println!("   recovered, {} reconnect attempts", controller.reconnect_attempts());

    println!("\n3. Phone call");
    bus.emit(SystemSignal::InterruptionBegan { should_resume: true })?;
    wait_until(&controller, PlaybackState::Idle).await;

    println!("\n4. Call ended");
    bus.emit(SystemSignal::InterruptionEnded { should_resume: true })?;
    wait_until(&controller, PlaybackState::Playing).await;

    println!("\n5. Toggle off");
    controller.toggle("demo finished")?;

    println!("\n=== Demo Complete ===");
    Ok(())
}

async fn wait_until(controller: &PlaybackController, state: PlaybackState) {
    for _ in 0..100 {
        if controller.state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    println!("   (timed out waiting for {})", state.as_str());
}
