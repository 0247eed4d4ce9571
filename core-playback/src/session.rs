//! # Playback Session
//!
//! Observable fields of the current playback attempt. UI layers bind to
//! these through [`PlaybackSession::observable`]; only the controller writes
//! them.

use crate::error::PlaybackError;
use bridge_traits::AudioSource;
use core_runtime::{EventBus, Observable, ObservableProperty, PropertyValue};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Name the session observable reports in change events.
pub const SESSION_OBJECT_NAME: &str = "playback_session";

pub const STATE_KEY: &str = "state";
pub const IS_PLAYING_KEY: &str = "is_playing";
pub const VOLUME_KEY: &str = "volume";
pub const TRACK_DURATION_KEY: &str = "track_duration_ms";
pub const REMAINING_KEY: &str = "remaining_ms";
pub const SPEED_KEY: &str = "speed";

/// Lifecycle of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing loaded.
    #[default]
    Idle,
    /// Play request handed to the player, not yet resolved.
    Loading,
    Playing,
    Paused,
    /// Track played to the end and the player was released.
    Completed,
    /// The player failed; only `stop` or a new `play` leave this state.
    Error,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Completed => "completed",
            PlaybackState::Error => "error",
        }
    }

    /// States a new `play` may start from.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            PlaybackState::Idle | PlaybackState::Completed | PlaybackState::Error
        )
    }

    /// States with a track loaded in the player.
    pub fn has_track(&self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PlaybackState> for PropertyValue {
    fn from(state: PlaybackState) -> Self {
        PropertyValue::Text(state.as_str().to_string())
    }
}

/// Playback rates the player supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackSpeed {
    #[default]
    Normal,
    OneAndHalf,
    Double,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 3] = [
        PlaybackSpeed::Normal,
        PlaybackSpeed::OneAndHalf,
        PlaybackSpeed::Double,
    ];

    pub fn multiplier(&self) -> f32 {
        match self {
            PlaybackSpeed::Normal => 1.0,
            PlaybackSpeed::OneAndHalf => 1.5,
            PlaybackSpeed::Double => 2.0,
        }
    }
}

impl TryFrom<f32> for PlaybackSpeed {
    type Error = PlaybackError;

    fn try_from(multiplier: f32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|speed| (speed.multiplier() - multiplier).abs() < f32::EPSILON)
            .ok_or(PlaybackError::UnsupportedSpeed(multiplier))
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

impl From<PlaybackSpeed> for PropertyValue {
    fn from(speed: PlaybackSpeed) -> Self {
        PropertyValue::Number(f64::from(speed.multiplier()))
    }
}

#[derive(Debug, Default)]
struct SessionMeta {
    id: Option<Uuid>,
    source: Option<AudioSource>,
    last_error: Option<String>,
}

/// Fields of the current playback session.
///
/// Observable fields notify on change; `source`, `session_id` and
/// `last_error` are plain values set when a session starts or fails.
pub struct PlaybackSession {
    observable: Observable,
    pub(crate) state: ObservableProperty<PlaybackState>,
    pub(crate) is_playing: ObservableProperty<bool>,
    pub(crate) volume: ObservableProperty<f32>,
    pub(crate) track_duration_ms: ObservableProperty<u64>,
    pub(crate) remaining_ms: ObservableProperty<u64>,
    pub(crate) speed: ObservableProperty<PlaybackSpeed>,
    meta: Mutex<SessionMeta>,
}

impl PlaybackSession {
    pub(crate) fn new(event_bus: Option<EventBus>, initial_volume: f32) -> Self {
        let observable = match event_bus {
            Some(bus) => Observable::with_event_bus(SESSION_OBJECT_NAME, bus),
            None => Observable::new(SESSION_OBJECT_NAME),
        };

        Self {
            state: observable.property(STATE_KEY, PlaybackState::Idle),
            is_playing: observable.property(IS_PLAYING_KEY, false),
            volume: observable.property(VOLUME_KEY, initial_volume),
            track_duration_ms: observable.property(TRACK_DURATION_KEY, 0u64),
            remaining_ms: observable.property(REMAINING_KEY, 0u64),
            speed: observable.property(SPEED_KEY, PlaybackSpeed::Normal),
            meta: Mutex::new(SessionMeta::default()),
            observable,
        }
    }

    /// Handle for registering change listeners.
    pub fn observable(&self) -> &Observable {
        &self.observable
    }

    pub fn state(&self) -> PlaybackState {
        self.state.get()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing.get()
    }

    pub fn volume(&self) -> f32 {
        self.volume.get()
    }

    pub fn track_duration_ms(&self) -> u64 {
        self.track_duration_ms.get()
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms.get()
    }

    /// Played portion of the track, derived from duration and remaining time.
    pub fn elapsed_ms(&self) -> u64 {
        self.track_duration_ms()
            .saturating_sub(self.remaining_ms())
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed.get()
    }

    pub fn source(&self) -> Option<AudioSource> {
        self.meta.lock().source.clone()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.meta.lock().id
    }

    /// Payload of the most recent failure of this session, if any.
    pub fn last_error(&self) -> Option<String> {
        self.meta.lock().last_error.clone()
    }

    /// Writes `state` and `is_playing` together; listeners see both.
    pub(crate) fn transition(&self, state: PlaybackState, is_playing: bool) {
        self.observable.batch(|| {
            self.state.set(state);
            self.is_playing.set(is_playing);
        });
    }

    /// Starts a new session: fresh id, new source, timing fields reset.
    pub(crate) fn begin(&self, source: AudioSource) -> Uuid {
        let id = Uuid::new_v4();
        {
            let mut meta = self.meta.lock();
            meta.id = Some(id);
            meta.source = Some(source);
            meta.last_error = None;
        }

        self.observable.batch(|| {
            self.state.set(PlaybackState::Loading);
            self.is_playing.set(false);
            self.track_duration_ms.set(0);
            self.remaining_ms.set(0);
            self.speed.set(PlaybackSpeed::Normal);
        });
        id
    }

    /// Records a started track; `remaining` starts at the full duration.
    pub(crate) fn start_playing(&self, duration: Option<Duration>) {
        let duration_ms = duration.map(duration_to_ms).unwrap_or(0);
        self.observable.batch(|| {
            self.state.set(PlaybackState::Playing);
            self.is_playing.set(true);
            self.track_duration_ms.set(duration_ms);
            self.remaining_ms.set(duration_ms);
        });
    }

    /// Recomputes remaining time from the player position. Returns the new
    /// remaining value.
    pub(crate) fn update_position(&self, position: Duration) -> u64 {
        let remaining = self
            .track_duration_ms()
            .saturating_sub(duration_to_ms(position));
        self.remaining_ms.set(remaining);
        remaining
    }

    pub(crate) fn record_error(&self, message: impl Into<String>) {
        self.meta.lock().last_error = Some(message.into());
    }
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("session_id", &self.session_id())
            .field("state", &self.state())
            .field("is_playing", &self.is_playing())
            .field("volume", &self.volume())
            .field("track_duration_ms", &self.track_duration_ms())
            .field("remaining_ms", &self.remaining_ms())
            .field("speed", &self.speed())
            .finish()
    }
}

pub(crate) fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
