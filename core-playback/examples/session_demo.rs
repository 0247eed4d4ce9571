//! # Playback Session Example
//!
//! Drives a playback session end to end against a simulated player: play,
//! speed change, volume slider, pause/resume, and natural completion.
//!
//! Run with: `cargo run --example session_demo --package core-playback`

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioSource, BridgeError, ConsoleLogger, LogLevel, PlayerCallbacks, PlayerCapability,
    PlayerOptions,
};
use core_async::task::{self, JoinHandle};
use core_async::time::{sleep, Duration, Instant};
use core_playback::{PlaybackConfig, PlaybackController, PlaybackSpeed, PlaybackState};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventStream};
use core_runtime::logging::{init_logging, LogFormat};
use parking_lot::Mutex;
use std::sync::Arc;

// ============================================================================
// Simulated Player (for demonstration)
// ============================================================================

#[derive(Default)]
struct Transport {
    playing: bool,
    played: Duration,
    resumed_at: Option<Instant>,
    speed: f32,
    callbacks: Option<PlayerCallbacks>,
    finisher: Option<JoinHandle<()>>,
}

impl Transport {
    fn position(&self) -> Duration {
        match self.resumed_at {
            Some(at) if self.playing => self.played + at.elapsed().mul_f32(self.speed),
            _ => self.played,
        }
    }
}

/// Plays nothing, but keeps time like a real engine and raises the
/// completion callback when the track runs out.
struct SimulatedPlayer {
    length: Duration,
    transport: Arc<Mutex<Transport>>,
}

impl SimulatedPlayer {
    fn new(length: Duration) -> Self {
        Self {
            length,
            transport: Arc::new(Mutex::new(Transport {
                speed: 1.0,
                ..Transport::default()
            })),
        }
    }

    /// Schedules the completion callback for when the remaining audio ends.
    fn schedule_finish(&self, transport: &mut Transport) {
        if let Some(previous) = transport.finisher.take() {
            previous.abort();
        }
        let left = self.length.saturating_sub(transport.position());
        let wall_clock = left.div_f32(transport.speed);
        let shared = Arc::clone(&self.transport);
        transport.finisher = Some(task::spawn(async move {
            sleep(wall_clock).await;
            let callbacks = {
                let mut transport = shared.lock();
                transport.playing = false;
                transport.callbacks.clone()
            };
            if let Some(callbacks) = callbacks {
                callbacks.completed();
            }
        }));
    }

    fn halt(transport: &mut Transport) {
        transport.played = transport.position();
        transport.playing = false;
        transport.resumed_at = None;
        if let Some(finisher) = transport.finisher.take() {
            finisher.abort();
        }
    }
}

#[async_trait]
impl PlayerCapability for SimulatedPlayer {
    async fn play_from_file(&self, options: PlayerOptions) -> BridgeResult<()> {
        let mut transport = self.transport.lock();
        transport.callbacks = Some(options.callbacks.clone());
        transport.played = Duration::ZERO;
        transport.playing = true;
        transport.resumed_at = Some(Instant::now());
        options.callbacks.info("simulated engine ready");
        self.schedule_finish(&mut transport);
        Ok(())
    }

    async fn play_from_url(&self, _options: PlayerOptions) -> BridgeResult<()> {
        Err(BridgeError::NotAvailable(
            "the simulated player has no network".to_string(),
        ))
    }

    async fn pause(&self) -> BridgeResult<()> {
        Self::halt(&mut self.transport.lock());
        Ok(())
    }

    async fn resume(&self) -> BridgeResult<()> {
        let mut transport = self.transport.lock();
        transport.playing = true;
        transport.resumed_at = Some(Instant::now());
        self.schedule_finish(&mut transport);
        Ok(())
    }

    async fn dispose(&self) -> BridgeResult<()> {
        let mut transport = self.transport.lock();
        Self::halt(&mut transport);
        transport.callbacks = None;
        Ok(())
    }

    async fn seek_to(&self, position: Duration) -> BridgeResult<()> {
        let mut transport = self.transport.lock();
        transport.played = position;
        if transport.playing {
            transport.resumed_at = Some(Instant::now());
            self.schedule_finish(&mut transport);
        }
        Ok(())
    }

    async fn track_duration(&self) -> BridgeResult<Duration> {
        Ok(self.length)
    }

    fn change_speed(&self, multiplier: f32) -> BridgeResult<()> {
        let mut transport = self.transport.lock();
        let playing = transport.playing;
        Self::halt(&mut transport);
        transport.speed = multiplier;
        if playing {
            transport.playing = true;
            transport.resumed_at = Some(Instant::now());
            self.schedule_finish(&mut transport);
        }
        Ok(())
    }

    fn set_volume(&self, level: f32) {
        tracing::debug!(level, "Simulated player volume");
    }

    fn current_position(&self) -> Duration {
        self.transport.lock().position()
    }

    fn is_playing(&self) -> bool {
        self.transport.lock().playing
    }
}

// ============================================================================
// Demo
// ============================================================================

#[core_async::main]
async fn main() -> anyhow::Result<()> {
    let core = CoreConfig::builder()
        .player(Arc::new(SimulatedPlayer::new(Duration::from_secs(6))))
        .logger_sink(Arc::new(ConsoleLogger {
            min_level: LogLevel::Warn,
        }))
        .build()?;
    init_logging(
        core.logging_config()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    )?;
    let config = PlaybackConfig::default().with_tracking_interval(Duration::from_millis(500));
    let controller = PlaybackController::new(&core, config)?;

    controller.session().observable().on_property_change(|event| {
        println!("  [{}] {} = {:?}", event.object, event.property_name, event.value);
    });

    let mut events = EventStream::new(controller.event_bus().subscribe())
        .filter(|event| matches!(event, CoreEvent::Playback(_)));
    let printer = task::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("  event: {}", event.description());
        }
    });

    println!("Remote sources are refused by this player:");
    if let Err(err) = controller
        .play(AudioSource::remote("https://cdn.example.com/2514.mp3?token=secret"))
        .await
    {
        println!("  play failed: {err}");
    }

    println!("\nPlaying a local file:");
    controller.play(AudioSource::local("/music/angel.mp3")).await?;
    controller.set_volume_from_slider(65.0)?;
    sleep(Duration::from_millis(1_600)).await;

    println!("\nDouble speed:");
    controller.set_speed(PlaybackSpeed::Double)?;
    sleep(Duration::from_millis(1_100)).await;

    println!("\nPause for a second:");
    controller.pause().await?;
    sleep(Duration::from_secs(1)).await;
    controller.resume().await?;

    println!("\nWaiting for the track to finish...");
    while controller.state() == PlaybackState::Playing {
        sleep(Duration::from_millis(250)).await;
    }
    println!("Session ended in state: {}", controller.state());

    controller.stop().await?;
    printer.abort();
    Ok(())
}
