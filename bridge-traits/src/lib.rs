//! # Host Bridge Traits
//!
//! Capabilities the audio session core needs from its host platform.
//!
//! ## Traits
//!
//! - [`PlayerCapability`](player::PlayerCapability) - Native audio engine (load, pause, resume, dispose, seek, speed, volume)
//! - [`UserNotifier`](notifier::UserNotifier) - User-visible notices and error reports
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core refuses to start without a player. Configuration reports a
//! descriptive error instead of panicking later:
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder().build();
//! assert!(config.is_err()); // CapabilityMissing { capability: "PlayerCapability", .. }
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert native errors into it and keep the message
//! actionable (which file, which URL, what the engine said).
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` because implementations are shared
//! behind `Arc` between the controller and its duration tracker task.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::player::{PlayerCapability, PlayerOptions};
//! use bridge_traits::error::Result;
//! use std::time::Duration;
//!
//! struct NativePlayer { /* engine handle */ }
//!
//! #[async_trait::async_trait]
//! impl PlayerCapability for NativePlayer {
//!     async fn play_from_file(&self, options: PlayerOptions) -> Result<()> {
//!         // hand options.source to the engine, keep options.callbacks
//!         todo!()
//!     }
//!     // ...
//! }
//! ```

pub mod error;
pub mod logging;
pub mod notifier;
pub mod platform;
pub mod player;

pub use error::BridgeError;

// Re-export commonly used types
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use notifier::{ConsoleNotifier, UserNotifier};
pub use player::{
    AudioSource, PlayerCallbacks, PlayerCapability, PlayerEvent, PlayerOptions, SourceKind,
    TaggedPlayerEvent,
};
