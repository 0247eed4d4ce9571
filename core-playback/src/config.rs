//! # Playback Configuration
//!
//! Tunables for the playback session controller. Every field has a serde
//! default, so a host can deserialize a partial document (or `{}`).

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for the duration tracking period. Longer periods make the
/// remaining-time display useless.
pub const MAX_TRACKING_INTERVAL: Duration = Duration::from_secs(60);

/// What to do with a volume level outside `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumePolicy {
    /// Refuse the request with [`PlaybackError::InvalidVolume`].
    #[default]
    Reject,
    /// Pin the level to the nearest bound.
    Clamp,
}

impl VolumePolicy {
    /// Returns the level to hand to the player.
    ///
    /// NaN is rejected under either policy.
    pub fn apply(self, level: f32) -> Result<f32> {
        if level.is_nan() {
            return Err(PlaybackError::InvalidVolume(level));
        }

        match self {
            VolumePolicy::Reject if (0.0..=1.0).contains(&level) => Ok(level),
            VolumePolicy::Reject => Err(PlaybackError::InvalidVolume(level)),
            VolumePolicy::Clamp => Ok(level.clamp(0.0, 1.0)),
        }
    }
}

/// Playback controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// How often remaining time is recomputed while playing.
    ///
    /// Default: 1 second.
    #[serde(default = "default_tracking_interval")]
    pub tracking_interval: Duration,

    /// Handling of out-of-range volume levels.
    ///
    /// Default: [`VolumePolicy::Reject`].
    #[serde(default)]
    pub volume_policy: VolumePolicy,

    /// Volume level a new controller starts with.
    ///
    /// Default: 1.0.
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,

    /// Passed to the player with every play request.
    ///
    /// Default: false.
    #[serde(default)]
    pub looping: bool,

    /// Ask the player for verbose native logging.
    ///
    /// Default: false.
    #[serde(default)]
    pub player_debug: bool,
}

fn default_tracking_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_initial_volume() -> f32 {
    1.0
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tracking_interval: default_tracking_interval(),
            volume_policy: VolumePolicy::default(),
            initial_volume: default_initial_volume(),
            looping: false,
            player_debug: false,
        }
    }
}

impl PlaybackConfig {
    pub fn with_tracking_interval(mut self, interval: Duration) -> Self {
        self.tracking_interval = interval;
        self
    }

    pub fn with_volume_policy(mut self, policy: VolumePolicy) -> Self {
        self.volume_policy = policy;
        self
    }

    pub fn with_initial_volume(mut self, level: f32) -> Self {
        self.initial_volume = level;
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_player_debug(mut self, debug: bool) -> Self {
        self.player_debug = debug;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.tracking_interval.is_zero() {
            return Err(PlaybackError::Config(
                "tracking_interval must be > 0".to_string(),
            ));
        }

        if self.tracking_interval > MAX_TRACKING_INTERVAL {
            return Err(PlaybackError::Config(format!(
                "tracking_interval cannot exceed {:?}",
                MAX_TRACKING_INTERVAL
            )));
        }

        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(PlaybackError::Config(
                "initial_volume must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }
}
