//! # Playback Session Module
//!
//! Drives a host audio player through one playback session at a time.
//!
//! ## Overview
//!
//! This module handles:
//! - The session state machine (`Idle`, `Loading`, `Playing`, `Paused`,
//!   `Completed`, `Error`)
//! - Observable session fields for UI binding
//! - Remaining-time tracking while a track plays
//! - Player callbacks (completion, error, info) tagged per session

pub mod config;
pub mod controller;
pub mod error;
pub mod session;
pub mod tracker;

pub use config::{PlaybackConfig, VolumePolicy};
pub use controller::{describe_source, PlaybackController};
pub use error::{PlaybackError, Result};
pub use session::{PlaybackSession, PlaybackSpeed, PlaybackState};
pub use tracker::DurationTracker;
