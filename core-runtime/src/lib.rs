//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the audio session core:
//! - Observable properties with change notification
//! - Event bus for playback and property events
//! - Logging and tracing setup
//! - Host configuration
//!
//! The playback controller in `core-playback` builds on all four; a host UI
//! only needs this crate to bind to session fields or subscribe to events.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod observable;

pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
pub use observable::{
    ListenerId, Observable, ObservableProperty, PropertyChangeEvent, PropertyNotifier,
    PropertyValue,
};
