//! # Core Configuration Module
//!
//! Collects the host capabilities the audio session core runs against.
//!
//! ## Required Dependencies
//!
//! - `PlayerCapability` - the native audio engine; there is no default
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `UserNotifier` - defaults to [`ConsoleNotifier`], which logs notices
//! - `LoggerSink` - host log forwarding, off unless provided; installed
//!   through [`CoreConfig::logging_config`]
//! - `EventBus` - created with `event_buffer_size` unless one is shared in
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .player(Arc::new(MyNativePlayer::new()))
//!     .notifier(Arc::new(MyDialogNotifier))
//!     .event_buffer_size(256)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! The builder fails fast with an actionable message when the player is
//! missing:
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing player capability");
//! ```

use crate::error::{Error, Result};
use crate::events::{EventBus, DEFAULT_EVENT_BUFFER_SIZE};
use crate::logging::LoggingConfig;
use bridge_traits::{ConsoleNotifier, LoggerSink, PlayerCapability, UserNotifier};
use std::sync::Arc;

/// Largest accepted event buffer. Position updates arrive once per second,
/// so anything beyond this only hides a stuck subscriber.
pub const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Host capabilities and shared runtime services.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Native audio engine (required)
    pub player: Arc<dyn PlayerCapability>,

    /// Receiver of user-visible notices and error reports
    pub notifier: Arc<dyn UserNotifier>,

    /// Host log forwarding, if any
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Bus that playback and property events are published on
    pub event_bus: EventBus,

    /// Buffer size the bus was created with
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("player", &"PlayerCapability { ... }")
            .field("notifier", &"UserNotifier { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("event_bus", &self.event_bus)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        validate_buffer_size(self.event_buffer_size)
    }

    /// Logging settings that forward to the configured host sink, if any.
    ///
    /// ```ignore
    /// init_logging(core.logging_config().with_level(LogLevel::Debug))?;
    /// ```
    pub fn logging_config(&self) -> LoggingConfig {
        match &self.logger_sink {
            Some(sink) => LoggingConfig::default().with_logger_sink(Arc::clone(sink)),
            None => LoggingConfig::default(),
        }
    }
}

fn validate_buffer_size(size: usize) -> Result<()> {
    if size == 0 {
        return Err(Error::Config(
            "Event buffer size must be greater than 0".to_string(),
        ));
    }

    if size > MAX_EVENT_BUFFER_SIZE {
        return Err(Error::Config(format!(
            "Event buffer size exceeds maximum of {}",
            MAX_EVENT_BUFFER_SIZE
        )));
    }

    Ok(())
}

fn player_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "PlayerCapability".to_string(),
        message: "A PlayerCapability implementation is required to play audio. \
                 Mobile: wrap the platform audio plugin. \
                 Desktop: inject a mixer-backed player. \
                 Tests: inject a fake or mock player."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    player: Option<Arc<dyn PlayerCapability>>,
    notifier: Option<Arc<dyn UserNotifier>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    event_bus: Option<EventBus>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the native audio engine.
    pub fn player(mut self, player: Arc<dyn PlayerCapability>) -> Self {
        self.player = Some(player);
        self
    }

    /// Sets the receiver of user-visible notices.
    pub fn notifier(mut self, notifier: Arc<dyn UserNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the host log sink.
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Shares an existing event bus instead of creating one.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Sets the buffer size of the event bus created by [`build`](Self::build).
    /// Ignored when an existing bus is supplied.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] if no player was provided
    /// - [`Error::Config`] if the event buffer size is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let player = self.player.ok_or_else(player_missing_error)?;

        let event_buffer_size = self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        validate_buffer_size(event_buffer_size)?;

        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(ConsoleNotifier) as Arc<dyn UserNotifier>);
        let event_bus = self
            .event_bus
            .unwrap_or_else(|| EventBus::new(event_buffer_size));

        let config = CoreConfig {
            player,
            notifier,
            logger_sink: self.logger_sink,
            event_bus,
            event_buffer_size,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{ConsoleLogger, PlayerOptions};
    use std::time::Duration;

    struct SilentPlayer;

    #[async_trait]
    impl PlayerCapability for SilentPlayer {
        async fn play_from_file(&self, _options: PlayerOptions) -> BridgeResult<()> {
            Ok(())
        }
        async fn play_from_url(&self, _options: PlayerOptions) -> BridgeResult<()> {
            Ok(())
        }
        async fn pause(&self) -> BridgeResult<()> {
            Ok(())
        }
        async fn resume(&self) -> BridgeResult<()> {
            Ok(())
        }
        async fn dispose(&self) -> BridgeResult<()> {
            Ok(())
        }
        async fn seek_to(&self, _position: Duration) -> BridgeResult<()> {
            Ok(())
        }
        async fn track_duration(&self) -> BridgeResult<Duration> {
            Ok(Duration::ZERO)
        }
        fn change_speed(&self, _multiplier: f32) -> BridgeResult<()> {
            Ok(())
        }
        fn set_volume(&self, _level: f32) {}
        fn current_position(&self) -> Duration {
            Duration::ZERO
        }
        fn is_playing(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_missing_player_is_capability_error() {
        let err = CoreConfig::builder().build().unwrap_err();
        match err {
            Error::CapabilityMissing { capability, .. } => {
                assert_eq!(capability, "PlayerCapability")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = CoreConfig::builder()
            .player(Arc::new(SilentPlayer))
            .build()
            .unwrap();

        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.logger_sink.is_none());
        assert_eq!(config.event_bus.subscriber_count(), 0);
    }

    #[test]
    fn test_buffer_size_bounds() {
        let zero = CoreConfig::builder()
            .player(Arc::new(SilentPlayer))
            .event_buffer_size(0)
            .build();
        assert!(matches!(zero, Err(Error::Config(_))));

        let huge = CoreConfig::builder()
            .player(Arc::new(SilentPlayer))
            .event_buffer_size(MAX_EVENT_BUFFER_SIZE + 1)
            .build();
        assert!(matches!(huge, Err(Error::Config(_))));
    }

    #[test]
    fn test_shared_event_bus() {
        let bus = EventBus::new(4);
        let _rx = bus.subscribe();

        let config = CoreConfig::builder()
            .player(Arc::new(SilentPlayer))
            .event_bus(bus.clone())
            .build()
            .unwrap();

        assert_eq!(config.event_bus.subscriber_count(), 1);
    }

    #[test]
    fn test_logging_config_carries_sink() {
        let without = CoreConfig::builder()
            .player(Arc::new(SilentPlayer))
            .build()
            .unwrap();
        assert!(without.logging_config().logger_sink.is_none());

        let with = CoreConfig::builder()
            .player(Arc::new(SilentPlayer))
            .logger_sink(Arc::new(ConsoleLogger::default()))
            .build()
            .unwrap();
        assert!(with.logging_config().logger_sink.is_some());
    }

    #[test]
    fn test_debug_hides_capabilities() {
        let config = CoreConfig::builder()
            .player(Arc::new(SilentPlayer))
            .build()
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("PlayerCapability { ... }"));
    }
}
