//! Workspace facade crate.
//!
//! Re-exports the audio session crates behind feature flags so a host
//! application can depend on `audio-session-workspace` alone:
//!
//! - `runtime`: observable properties, event bus, logging, host config
//! - `playback` (default): the playback session controller

#[cfg(feature = "runtime")]
pub use bridge_traits;
#[cfg(feature = "runtime")]
pub use core_runtime;

#[cfg(feature = "playback")]
pub use core_playback;
