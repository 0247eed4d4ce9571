//! Shared fixtures for the controller integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, PlayerCallbacks, PlayerCapability, PlayerEvent, PlayerOptions, UserNotifier,
};
use core_async::sync::oneshot;
use core_async::task;
use core_async::time::{sleep, Instant};
use core_playback::{PlaybackConfig, PlaybackController};
use core_runtime::config::CoreConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const TRACK_LENGTH: Duration = Duration::from_secs(30);

// ============================================================================
// Fake player
// ============================================================================

#[derive(Default)]
struct FakeState {
    duration: Option<Duration>,
    fail_play: bool,
    fail_pause: bool,
    fail_dispose: bool,
    playing: bool,
    base_position: Duration,
    started_at: Option<Instant>,
    callbacks: Option<PlayerCallbacks>,
    last_options: Option<(bool, bool)>,
    calls: HashMap<&'static str, usize>,
    volume: Option<f32>,
    speed: f32,
    raise_while_loading: Option<PlayerEvent>,
}

/// Stateful stand-in for a host engine. The playhead advances with the
/// (possibly paused) Tokio clock while playing.
pub struct FakePlayer {
    state: Mutex<FakeState>,
    play_gate: Mutex<Option<oneshot::Receiver<()>>>,
    dispose_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakePlayer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                duration: Some(TRACK_LENGTH),
                speed: 1.0,
                ..FakeState::default()
            }),
            play_gate: Mutex::new(None),
            dispose_gate: Mutex::new(None),
        }
    }

    pub fn without_duration(self) -> Self {
        self.state.lock().duration = None;
        self
    }

    pub fn failing_play(self) -> Self {
        self.state.lock().fail_play = true;
        self
    }

    pub fn failing_pause(self) -> Self {
        self.state.lock().fail_pause = true;
        self
    }

    pub fn failing_dispose(self) -> Self {
        self.state.lock().fail_dispose = true;
        self
    }

    /// Fires `event` from inside the play request, before it returns.
    pub fn raising_while_loading(self, event: PlayerEvent) -> Self {
        self.state.lock().raise_while_loading = Some(event);
        self
    }

    /// Holds the next dispose request until the returned sender fires.
    pub fn hold_next_dispose(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        *self.dispose_gate.lock() = Some(gate);
        release
    }

    /// Holds the next play request until the returned sender fires.
    pub fn hold_next_play(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        *self.play_gate.lock() = Some(gate);
        release
    }

    pub fn calls(&self, name: &str) -> usize {
        self.state.lock().calls.get(name).copied().unwrap_or(0)
    }

    /// Callback handle from the most recent successful play request.
    pub fn callbacks(&self) -> PlayerCallbacks {
        self.state
            .lock()
            .callbacks
            .clone()
            .expect("no track loaded")
    }

    pub fn last_options(&self) -> Option<(bool, bool)> {
        self.state.lock().last_options
    }

    pub fn applied_volume(&self) -> Option<f32> {
        self.state.lock().volume
    }

    pub fn applied_speed(&self) -> f32 {
        self.state.lock().speed
    }

    fn record(&self, name: &'static str) {
        *self.state.lock().calls.entry(name).or_default() += 1;
    }

    async fn load(&self, name: &'static str, options: PlayerOptions) -> BridgeResult<()> {
        self.record(name);
        let gate = self.play_gate.lock().take();
        if let Some(gate) = gate {
            gate.await.ok();
        }

        let raised = {
            let mut state = self.state.lock();
            state.last_options = Some((options.looping, options.debug));
            if state.fail_play {
                return Err(BridgeError::Rejected("unsupported format".to_string()));
            }
            state.callbacks = Some(options.callbacks.clone());
            state.playing = true;
            state.base_position = Duration::ZERO;
            state.started_at = Some(Instant::now());
            state.raise_while_loading.take()
        };

        if let Some(event) = raised {
            options.callbacks.deliver(event);
            // Give the core a chance to handle the callback before returning.
            sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }
}

impl FakeState {
    fn position(&self) -> Duration {
        match self.started_at {
            Some(started) if self.playing => self.base_position + started.elapsed(),
            _ => self.base_position,
        }
    }
}

#[async_trait]
impl PlayerCapability for FakePlayer {
    async fn play_from_file(&self, options: PlayerOptions) -> BridgeResult<()> {
        self.load("play_from_file", options).await
    }

    async fn play_from_url(&self, options: PlayerOptions) -> BridgeResult<()> {
        self.load("play_from_url", options).await
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record("pause");
        let mut state = self.state.lock();
        if state.fail_pause {
            return Err(BridgeError::OperationFailed("audio focus lost".to_string()));
        }
        state.base_position = state.position();
        state.playing = false;
        state.started_at = None;
        Ok(())
    }

    async fn resume(&self) -> BridgeResult<()> {
        self.record("resume");
        let mut state = self.state.lock();
        state.playing = true;
        state.started_at = Some(Instant::now());
        Ok(())
    }

    async fn dispose(&self) -> BridgeResult<()> {
        self.record("dispose");
        let gate = self.dispose_gate.lock().take();
        if let Some(gate) = gate {
            gate.await.ok();
        }

        let mut state = self.state.lock();
        state.playing = false;
        state.started_at = None;
        state.callbacks = None;
        if state.fail_dispose {
            return Err(BridgeError::OperationFailed("release failed".to_string()));
        }
        Ok(())
    }

    async fn seek_to(&self, position: Duration) -> BridgeResult<()> {
        self.record("seek_to");
        let mut state = self.state.lock();
        state.base_position = position;
        if state.playing {
            state.started_at = Some(Instant::now());
        }
        Ok(())
    }

    async fn track_duration(&self) -> BridgeResult<Duration> {
        self.record("track_duration");
        self.state
            .lock()
            .duration
            .ok_or_else(|| BridgeError::NotAvailable("duration unknown".to_string()))
    }

    fn change_speed(&self, multiplier: f32) -> BridgeResult<()> {
        self.record("change_speed");
        self.state.lock().speed = multiplier;
        Ok(())
    }

    fn set_volume(&self, level: f32) {
        self.state.lock().volume = Some(level);
    }

    fn current_position(&self) -> Duration {
        self.state.lock().position()
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }
}

// ============================================================================
// Notifier
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl UserNotifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.notices.lock().push(message.to_string());
    }

    fn log_error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }
}

// ============================================================================
// Harness
// ============================================================================

pub fn controller_with(
    player: Arc<dyn PlayerCapability>,
    config: PlaybackConfig,
) -> (PlaybackController, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let core = CoreConfig::builder()
        .player(player)
        .notifier(notifier.clone())
        .build()
        .expect("valid core config");
    let controller = PlaybackController::new(&core, config).expect("valid playback config");
    (controller, notifier)
}

pub fn controller(player: Arc<FakePlayer>) -> (PlaybackController, Arc<RecordingNotifier>) {
    controller_with(player, PlaybackConfig::default())
}

/// Lets spawned callback and tracking tasks run.
pub async fn settle() {
    for _ in 0..16 {
        task::yield_now().await;
    }
}
