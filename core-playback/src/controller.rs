//! # Playback Session Controller
//!
//! State machine over a host [`PlayerCapability`]:
//!
//! ```text
//! Idle -> Loading -> Playing <-> Paused
//!                       |
//!                       +-> Completed | Error
//! ```
//!
//! `stop` returns to `Idle` from any state; `play` may start from `Idle`,
//! `Completed` or `Error`.
//!
//! ## Sessions and generations
//!
//! Every `play` and `stop` bumps a generation counter. Player results,
//! duration ticks and callbacks carry the generation they were started
//! under and are dropped once it is no longer current, so a stale play
//! result can never resurrect a stopped session.
//!
//! Callbacks may arrive before `play` returns. An error fails the pending
//! `play` with [`PlaybackError::LoadFailed`]; a completion is held and
//! applied once the track has started.
//!
//! ## Locking
//!
//! The control lock is never held across an await. Field writes happen while
//! it is held so they are ordered with generation checks; property listeners
//! therefore run under it and must not call back into the controller
//! synchronously. Reading session fields from a listener is fine.
//!
//! ## Usage
//!
//! ```ignore
//! let controller = PlaybackController::new(&core_config, PlaybackConfig::default())?;
//! controller.session().observable().on_property_change(|event| {
//!     println!("{} = {:?}", event.property_name, event.value);
//! });
//!
//! controller.play(AudioSource::local("/music/track.mp3")).await?;
//! controller.set_speed(PlaybackSpeed::OneAndHalf)?;
//! controller.pause().await?;
//! controller.stop().await?;
//! ```

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::session::{duration_to_ms, PlaybackSession, PlaybackSpeed, PlaybackState};
use crate::tracker::DurationTracker;
use bridge_traits::{
    AudioSource, PlayerCallbacks, PlayerCapability, PlayerEvent, PlayerOptions, SourceKind,
    TaggedPlayerEvent, UserNotifier,
};
use core_async::sync::mpsc::UnboundedReceiver;
use core_async::task::{self, JoinHandle};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::{redact_url, strip_path};
use parking_lot::Mutex;
use std::ops::ControlFlow;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Notice shown after `stop` released the player.
pub const DISPOSED_NOTICE: &str = "Media player disposed";
/// Notice shown when a track played to the end.
pub const COMPLETED_NOTICE: &str = "Audio file complete";
/// Prefix of notices forwarded from the player's info callback.
pub const INFO_NOTICE_PREFIX: &str = "Info callback: ";

#[derive(Debug, Default)]
struct ControlState {
    generation: u64,
    tracker: Option<DurationTracker>,
    dispatcher: Option<JoinHandle<()>>,
    /// The completion callback fired before loading finished.
    completed_while_loading: bool,
}

impl ControlState {
    /// Invalidates everything tied to the current session.
    fn advance(&mut self) -> u64 {
        self.generation += 1;
        self.tracker = None;
        self.completed_while_loading = false;
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.abort();
        }
        self.generation
    }
}

struct ControllerInner {
    player: Arc<dyn PlayerCapability>,
    notifier: Arc<dyn UserNotifier>,
    event_bus: EventBus,
    config: PlaybackConfig,
    session: PlaybackSession,
    control: Mutex<ControlState>,
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.control.get_mut().dispatcher.take() {
            dispatcher.abort();
        }
    }
}

/// Drives one playback session at a time against the host player.
///
/// Cloning is cheap; clones control the same session.
#[derive(Clone)]
pub struct PlaybackController {
    inner: Arc<ControllerInner>,
}

impl PlaybackController {
    /// Creates a controller from the host configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::Config`] if `config` fails validation.
    pub fn new(core: &CoreConfig, config: PlaybackConfig) -> Result<Self> {
        Self::with_parts(
            Arc::clone(&core.player),
            Arc::clone(&core.notifier),
            core.event_bus.clone(),
            config,
        )
    }

    /// Creates a controller from individual capabilities.
    pub fn with_parts(
        player: Arc<dyn PlayerCapability>,
        notifier: Arc<dyn UserNotifier>,
        event_bus: EventBus,
        config: PlaybackConfig,
    ) -> Result<Self> {
        config.validate()?;

        let session = PlaybackSession::new(Some(event_bus.clone()), config.initial_volume);
        Ok(Self {
            inner: Arc::new(ControllerInner {
                player,
                notifier,
                event_bus,
                config,
                session,
                control: Mutex::new(ControlState::default()),
            }),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Observable fields of the current session.
    pub fn session(&self) -> &PlaybackSession {
        &self.inner.session
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.inner.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.session.state()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.session.is_playing()
    }

    pub fn volume(&self) -> f32 {
        self.inner.session.volume()
    }

    pub fn track_duration_ms(&self) -> u64 {
        self.inner.session.track_duration_ms()
    }

    pub fn remaining_ms(&self) -> u64 {
        self.inner.session.remaining_ms()
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.inner.session.speed()
    }

    pub fn source(&self) -> Option<AudioSource> {
        self.inner.session.source()
    }

    /// `true` while a duration tracker is installed for the current session.
    pub fn is_tracking(&self) -> bool {
        self.inner
            .control
            .lock()
            .tracker
            .as_ref()
            .is_some_and(|tracker| !tracker.is_finished())
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Starts playing `source`, replacing a completed or failed session.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::InvalidState`] unless idle, completed or failed
    /// - [`PlaybackError::DelegateFailure`] if the player refused the source;
    ///   the session moves to `Error`
    /// - [`PlaybackError::LoadFailed`] if the error callback fired while the
    ///   track was loading
    /// - [`PlaybackError::Cancelled`] if `stop` or another `play` overtook
    ///   this request
    #[instrument(skip(self, source), fields(source = %describe_source(&source)))]
    pub async fn play(&self, source: AudioSource) -> Result<()> {
        let inner = &self.inner;

        let (generation, session_id, callbacks, receiver) = {
            let mut control = inner.control.lock();
            let state = inner.session.state();
            if !state.can_start() {
                return Err(PlaybackError::InvalidState {
                    state,
                    operation: "play",
                });
            }

            let generation = control.advance();
            let session_id = inner.session.begin(source.clone());
            let (callbacks, receiver) = PlayerCallbacks::channel(generation);
            (generation, session_id.to_string(), callbacks, receiver)
        };
        self.spawn_dispatcher(generation, receiver);

        info!(session_id = %session_id, kind = ?source.kind(), "Loading track");
        inner.emit(PlaybackEvent::Loading {
            session_id: session_id.clone(),
            source: describe_source(&source),
        });

        let options = PlayerOptions::new(source.clone(), callbacks)
            .with_looping(inner.config.looping)
            .with_debug(inner.config.player_debug);
        let outcome = match source.kind() {
            SourceKind::LocalFile => inner.player.play_from_file(options).await,
            SourceKind::RemoteUrl => inner.player.play_from_url(options).await,
        };

        if let Err(err) = outcome {
            let err = PlaybackError::delegate("play")(err);
            if !inner.fail(generation, &err) {
                return Err(PlaybackError::Cancelled);
            }
            return Err(err);
        }

        inner.ensure_loading(&inner.control.lock(), generation)?;

        let duration = match inner.player.track_duration().await {
            Ok(duration) => Some(duration),
            Err(err) => {
                warn!(
                    session_id = %session_id,
                    error = %err,
                    "Track duration unavailable, remaining time will not be tracked"
                );
                None
            }
        };

        let completed = {
            let mut control = inner.control.lock();
            inner.ensure_loading(&control, generation)?;

            inner.player.set_volume(inner.session.volume());
            inner.session.start_playing(duration);
            let completed = std::mem::take(&mut control.completed_while_loading);
            if completed {
                // The completion is finished below, outside the dispatcher.
                if let Some(dispatcher) = control.dispatcher.take() {
                    dispatcher.abort();
                }
            } else if duration.is_some() {
                control.tracker = Some(self.start_tracking(generation));
            }
            completed
        };

        let duration_ms = inner.session.track_duration_ms();
        info!(session_id = %session_id, duration_ms, "Playback started");
        inner.emit(PlaybackEvent::Started {
            session_id,
            source: describe_source(&source),
            duration_ms,
        });

        if completed {
            self.on_completed(generation).await;
        }
        Ok(())
    }

    /// Pauses a playing track and stops duration tracking.
    #[instrument(skip(self))]
    pub async fn pause(&self) -> Result<()> {
        let inner = &self.inner;
        let generation = inner.require("pause", |state| *state == PlaybackState::Playing)?;

        if let Err(err) = inner.player.pause().await {
            return Err(inner.report(PlaybackError::delegate("pause")(err)));
        }

        {
            let mut control = inner.control.lock();
            if control.generation != generation
                || inner.session.state() != PlaybackState::Playing
            {
                return Err(PlaybackError::Cancelled);
            }
            control.tracker = None;
            inner.session.transition(PlaybackState::Paused, false);
        }

        let position_ms = duration_to_ms(inner.player.current_position());
        info!(position_ms, "Playback paused");
        inner.emit(PlaybackEvent::Paused {
            session_id: inner.session_id(),
            position_ms,
        });
        Ok(())
    }

    /// Continues a paused track and restarts duration tracking.
    #[instrument(skip(self))]
    pub async fn resume(&self) -> Result<()> {
        let inner = &self.inner;
        let generation = inner.require("resume", |state| *state == PlaybackState::Paused)?;

        if let Err(err) = inner.player.resume().await {
            return Err(inner.report(PlaybackError::delegate("resume")(err)));
        }

        {
            let mut control = inner.control.lock();
            if control.generation != generation
                || inner.session.state() != PlaybackState::Paused
            {
                return Err(PlaybackError::Cancelled);
            }
            inner.session.transition(PlaybackState::Playing, true);
            if inner.session.track_duration_ms() > 0 {
                control.tracker = Some(self.start_tracking(generation));
            }
        }

        let position_ms = duration_to_ms(inner.player.current_position());
        info!(position_ms, "Playback resumed");
        inner.emit(PlaybackEvent::Resumed {
            session_id: inner.session_id(),
            position_ms,
        });
        Ok(())
    }

    /// Releases the player and returns to `Idle`. Valid from any state.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::DelegateFailure`] if the player failed to
    /// dispose; the session is `Idle` regardless.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let inner = &self.inner;
        let generation = inner.control.lock().advance();
        let session_id = inner.session.session_id().map(|id| id.to_string());

        let disposed = inner.player.dispose().await;

        {
            let control = inner.control.lock();
            if control.generation == generation {
                inner.session.transition(PlaybackState::Idle, false);
            }
        }

        if let Err(err) = disposed {
            return Err(inner.report(PlaybackError::delegate("stop")(err)));
        }

        info!(session_id = ?session_id, "Media player disposed");
        inner.notifier.notify(DISPOSED_NOTICE);
        inner.emit(PlaybackEvent::Stopped { session_id });
        Ok(())
    }

    // ========================================================================
    // Adjustments
    // ========================================================================

    /// Changes the playback rate of the loaded track.
    pub fn set_speed(&self, speed: PlaybackSpeed) -> Result<()> {
        let inner = &self.inner;
        inner.require("change speed", PlaybackState::has_track)?;

        if let Err(err) = inner.player.change_speed(speed.multiplier()) {
            return Err(inner.report(PlaybackError::delegate("change speed")(err)));
        }

        if inner.session.speed.set(speed) {
            debug!(%speed, "Playback speed changed");
            inner.emit(PlaybackEvent::SpeedChanged {
                session_id: inner.session_id(),
                multiplier: speed.multiplier(),
            });
        }
        Ok(())
    }

    /// Like [`set_speed`](Self::set_speed) for a raw multiplier.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::UnsupportedSpeed`] unless the multiplier is
    /// 1.0, 1.5 or 2.0.
    pub fn set_speed_multiplier(&self, multiplier: f32) -> Result<()> {
        let speed = PlaybackSpeed::try_from(multiplier).map_err(|err| self.inner.report(err))?;
        self.set_speed(speed)
    }

    /// Applies a volume level in `0.0..=1.0` immediately, in any state.
    ///
    /// Out-of-range levels are handled per the configured
    /// [`VolumePolicy`](crate::config::VolumePolicy). Returns the level
    /// applied to the player.
    pub fn set_volume(&self, level: f32) -> Result<f32> {
        let inner = &self.inner;
        let applied = inner
            .config
            .volume_policy
            .apply(level)
            .map_err(|err| inner.report(err))?;

        inner.player.set_volume(applied);
        if inner.session.volume.set(applied) {
            debug!(level = applied, "Volume changed");
            inner.emit(PlaybackEvent::VolumeChanged { level: applied });
        }
        Ok(applied)
    }

    /// Maps a 0-100 slider position onto the volume range.
    pub fn set_volume_from_slider(&self, value: f32) -> Result<f32> {
        self.set_volume(value / 100.0)
    }

    /// Moves the playhead and refreshes the remaining time.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::InvalidState`] unless playing or paused
    /// - [`PlaybackError::SeekOutOfBounds`] past the end of a track with a
    ///   known duration
    #[instrument(skip(self))]
    pub async fn seek(&self, position: Duration) -> Result<()> {
        let inner = &self.inner;
        let generation = inner.require("seek", PlaybackState::has_track)?;

        let duration_ms = inner.session.track_duration_ms();
        if duration_ms > 0 && duration_to_ms(position) > duration_ms {
            return Err(inner.report(PlaybackError::SeekOutOfBounds(position)));
        }

        if let Err(err) = inner.player.seek_to(position).await {
            return Err(inner.report(PlaybackError::delegate("seek")(err)));
        }

        let remaining_ms = {
            let control = inner.control.lock();
            if control.generation != generation || !inner.session.state().has_track() {
                return Err(PlaybackError::Cancelled);
            }
            inner.session.update_position(position)
        };

        inner.emit(PlaybackEvent::PositionChanged {
            session_id: inner.session_id(),
            position_ms: duration_to_ms(position),
            remaining_ms,
            duration_ms,
        });
        Ok(())
    }

    // ========================================================================
    // Player callbacks
    // ========================================================================

    /// Applies a callback raised by the player. Events tagged with a
    /// superseded session are ignored.
    pub async fn handle_player_event(&self, event: TaggedPlayerEvent) {
        let inner = &self.inner;
        if !inner.is_current(event.session_tag) {
            debug!(
                session_tag = event.session_tag,
                event = ?event.event,
                "Ignoring callback from a superseded session"
            );
            return;
        }

        match event.event {
            PlayerEvent::Completed => self.on_completed(event.session_tag).await,
            PlayerEvent::Error { payload } => {
                inner.fail(event.session_tag, &PlaybackError::PlaybackFailed(payload));
            }
            PlayerEvent::Info { info } => {
                debug!(%info, "Player info");
                inner.notifier.notify(&format!("{INFO_NOTICE_PREFIX}{info}"));
                inner.emit(PlaybackEvent::Info {
                    session_id: inner.session_id(),
                    info,
                });
            }
        }
    }

    async fn on_completed(&self, generation: u64) {
        let inner = &self.inner;
        {
            let mut control = inner.control.lock();
            if control.generation != generation {
                return;
            }
            let state = inner.session.state();
            if state == PlaybackState::Loading {
                debug!("Completion raised while loading, applied once playback starts");
                control.completed_while_loading = true;
                return;
            }
            if state != PlaybackState::Playing {
                debug!(%state, "Ignoring completion outside of playback");
                return;
            }

            // Later callbacks belong to a released player. The dispatcher is
            // detached so a concurrent `stop` cannot abort the dispose below.
            control.generation += 1;
            control.tracker = None;
            drop(control.dispatcher.take());
            inner.session.remaining_ms.set(0);
            inner
                .session
                .transition(PlaybackState::Completed, false);
        }

        if let Err(err) = inner.player.dispose().await {
            inner.report(PlaybackError::delegate("dispose")(err));
        }

        info!("Audio file complete");
        inner.notifier.notify(COMPLETED_NOTICE);
        inner.emit(PlaybackEvent::Completed {
            session_id: inner.session_id(),
        });
    }

    fn spawn_dispatcher(&self, generation: u64, mut receiver: UnboundedReceiver<TaggedPlayerEvent>) {
        let weak = Arc::downgrade(&self.inner);
        let handle = task::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let controller = PlaybackController { inner };
                controller.handle_player_event(event).await;
                if !controller.inner.is_current(generation) {
                    break;
                }
            }
        });

        let mut control = self.inner.control.lock();
        if control.generation == generation {
            control.dispatcher = Some(handle);
        } else {
            handle.abort();
        }
    }

    fn start_tracking(&self, generation: u64) -> DurationTracker {
        let weak: Weak<ControllerInner> = Arc::downgrade(&self.inner);
        DurationTracker::start(self.inner.config.tracking_interval, move || {
            match weak.upgrade() {
                Some(inner) => inner.refresh_remaining(generation),
                None => ControlFlow::Break(()),
            }
        })
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("session", &self.inner.session)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl ControllerInner {
    fn is_current(&self, generation: u64) -> bool {
        self.control.lock().generation == generation
    }

    /// Confirms `generation` is still loading. An error raised by the player
    /// meanwhile becomes the play result.
    fn ensure_loading(&self, control: &ControlState, generation: u64) -> Result<()> {
        if control.generation != generation {
            debug!("Discarding play result of a stopped session");
            return Err(PlaybackError::Cancelled);
        }
        match self.session.state() {
            PlaybackState::Loading => Ok(()),
            PlaybackState::Error => Err(PlaybackError::LoadFailed(
                self.session.last_error().unwrap_or_default(),
            )),
            state => {
                debug!(%state, "Discarding play result after a concurrent transition");
                Err(PlaybackError::Cancelled)
            }
        }
    }

    fn session_id(&self) -> String {
        self.session
            .session_id()
            .map(|id| id.to_string())
            .unwrap_or_default()
    }

    /// Checks the state for `operation` and returns the current generation.
    fn require(
        &self,
        operation: &'static str,
        allowed: impl Fn(&PlaybackState) -> bool,
    ) -> Result<u64> {
        let control = self.control.lock();
        let state = self.session.state();
        if allowed(&state) {
            Ok(control.generation)
        } else {
            Err(PlaybackError::InvalidState { state, operation })
        }
    }

    /// Logs `err`, forwards it to the notifier and hands it back.
    fn report(&self, err: PlaybackError) -> PlaybackError {
        warn!(error = %err, "Playback request failed");
        self.notifier.log_error(&err.to_string());
        self.emit(PlaybackEvent::Error {
            session_id: self.session.session_id().map(|id| id.to_string()),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
        });
        err
    }

    /// Moves the session to `Error`. Returns `false` if `generation` was
    /// already superseded and nothing changed.
    fn fail(&self, generation: u64, err: &PlaybackError) -> bool {
        let message = err.to_string();
        {
            let mut control = self.control.lock();
            if control.generation != generation {
                return false;
            }
            if self.session.state() == PlaybackState::Idle {
                return false;
            }
            control.tracker = None;
            self.session.record_error(message.as_str());
            self.session.transition(PlaybackState::Error, false);
        }

        error!(error = %message, "Playback failed");
        self.notifier.log_error(&message);
        self.emit(PlaybackEvent::Error {
            session_id: self.session.session_id().map(|id| id.to_string()),
            message,
            recoverable: err.is_recoverable(),
        });
        true
    }

    fn refresh_remaining(&self, generation: u64) -> ControlFlow<()> {
        let remaining_ms = {
            let control = self.control.lock();
            if control.generation != generation
                || self.session.state() != PlaybackState::Playing
            {
                return ControlFlow::Break(());
            }
            // Buffering; keep the last value.
            if !self.player.is_playing() {
                return ControlFlow::Continue(());
            }
            let before = self.session.remaining_ms();
            let after = self.session.update_position(self.player.current_position());
            if before == after {
                return ControlFlow::Continue(());
            }
            after
        };

        let duration_ms = self.session.track_duration_ms();
        self.emit(PlaybackEvent::PositionChanged {
            session_id: self.session_id(),
            position_ms: duration_ms.saturating_sub(remaining_ms),
            remaining_ms,
            duration_ms,
        });
        ControlFlow::Continue(())
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is not an error.
        self.event_bus.emit(CoreEvent::Playback(event)).ok();
    }
}

/// Log-safe rendering of a source: file basename or redacted URL.
pub fn describe_source(source: &AudioSource) -> String {
    match source {
        AudioSource::LocalFile { path } => strip_path(&path.to_string_lossy()).to_string(),
        AudioSource::RemoteUrl { url } => redact_url(url),
    }
}
