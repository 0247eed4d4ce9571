//! Player capability bridge.
//!
//! The core never decodes or renders audio itself. A host supplies a
//! [`PlayerCapability`] wrapping its native engine (ExoPlayer, AVAudioPlayer,
//! a desktop mixer, ...) and the session controller sequences calls into it.
//!
//! Asynchronous engine callbacks (track finished, engine error, informational
//! notices) travel back through the [`PlayerCallbacks`] handle handed over in
//! [`PlayerOptions`]. Each handle carries the tag of the session that created
//! it, so the core can discard callbacks that arrive after the session ended.

use crate::{error::Result, platform::PlatformSendSync};
use core_async::sync::mpsc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Which player entry point a source is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// File bundled with or downloaded to the host device.
    LocalFile,
    /// HTTP(S) resource streamed by the host engine.
    RemoteUrl,
}

/// Audio source descriptor handed to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioSource {
    LocalFile { path: PathBuf },
    RemoteUrl { url: String },
}

impl AudioSource {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        AudioSource::LocalFile { path: path.into() }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        AudioSource::RemoteUrl { url: url.into() }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            AudioSource::LocalFile { .. } => SourceKind::LocalFile,
            AudioSource::RemoteUrl { .. } => SourceKind::RemoteUrl,
        }
    }

    /// Determine whether the source represents remote content.
    pub fn is_remote(&self) -> bool {
        self.kind() == SourceKind::RemoteUrl
    }

    /// Path or URL as a display string.
    pub fn location(&self) -> String {
        match self {
            AudioSource::LocalFile { path } => path.display().to_string(),
            AudioSource::RemoteUrl { url } => url.clone(),
        }
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::LocalFile { path } => write!(f, "file:{}", path.display()),
            AudioSource::RemoteUrl { url } => f.write_str(url),
        }
    }
}

/// Callback raised by the host engine while a track is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "callback", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// The track played through to the end.
    Completed,
    /// The engine failed after playback started. The payload is whatever the
    /// engine reported, usually serialized JSON.
    Error { payload: String },
    /// Informational notice (buffering, route change, ...).
    Info { info: String },
}

/// A [`PlayerEvent`] stamped with the tag of the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedPlayerEvent {
    pub session_tag: u64,
    pub event: PlayerEvent,
}

/// Handle the host uses to deliver [`PlayerEvent`]s back to the core.
#[derive(Debug, Clone)]
pub struct PlayerCallbacks {
    session_tag: u64,
    sender: mpsc::UnboundedSender<TaggedPlayerEvent>,
}

impl PlayerCallbacks {
    /// Create a callback handle and the receiver the core drains.
    pub fn channel(session_tag: u64) -> (Self, mpsc::UnboundedReceiver<TaggedPlayerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                session_tag,
                sender,
            },
            receiver,
        )
    }

    pub fn session_tag(&self) -> u64 {
        self.session_tag
    }

    /// Deliver an event. Returns `false` when the session is gone and nobody
    /// is listening any more; hosts may ignore that.
    pub fn deliver(&self, event: PlayerEvent) -> bool {
        self.sender
            .send(TaggedPlayerEvent {
                session_tag: self.session_tag,
                event,
            })
            .is_ok()
    }

    pub fn completed(&self) -> bool {
        self.deliver(PlayerEvent::Completed)
    }

    pub fn error(&self, payload: impl Into<String>) -> bool {
        self.deliver(PlayerEvent::Error {
            payload: payload.into(),
        })
    }

    pub fn info(&self, info: impl Into<String>) -> bool {
        self.deliver(PlayerEvent::Info { info: info.into() })
    }
}

/// Options passed alongside a play request.
#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub source: AudioSource,
    /// Restart from the beginning when the track ends instead of completing.
    pub looping: bool,
    /// Ask the host engine for verbose native logging.
    pub debug: bool,
    pub callbacks: PlayerCallbacks,
}

impl PlayerOptions {
    pub fn new(source: AudioSource, callbacks: PlayerCallbacks) -> Self {
        Self {
            source,
            looping: false,
            debug: false,
            callbacks,
        }
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Host audio engine driven by the playback session controller.
///
/// One track is loaded at a time. Async methods resolve once the engine has
/// accepted (or refused) the request; the synchronous methods must be cheap
/// because the duration tracker calls them once per interval.
#[async_trait::async_trait]
pub trait PlayerCapability: PlatformSendSync {
    /// Load a local file and start playing it.
    async fn play_from_file(&self, options: PlayerOptions) -> Result<()>;

    /// Load a remote URL and start playing it.
    async fn play_from_url(&self, options: PlayerOptions) -> Result<()>;

    /// Pause without releasing the loaded track.
    async fn pause(&self) -> Result<()>;

    /// Continue a paused track from its current position.
    async fn resume(&self) -> Result<()>;

    /// Release the loaded track and any native resources.
    async fn dispose(&self) -> Result<()>;

    /// Move the playhead to an absolute position.
    async fn seek_to(&self, position: Duration) -> Result<()>;

    /// Total duration of the loaded track.
    async fn track_duration(&self) -> Result<Duration>;

    /// Change the playback rate multiplier.
    fn change_speed(&self, multiplier: f32) -> Result<()>;

    /// Set output volume, normalized to `0.0..=1.0`.
    fn set_volume(&self, level: f32);

    /// Current playhead position.
    fn current_position(&self) -> Duration;

    /// Whether the engine is currently producing audio.
    fn is_playing(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_follows_variant() {
        assert_eq!(AudioSource::local("/music/angel.mp3").kind(), SourceKind::LocalFile);
        let remote = AudioSource::remote("https://example.com/2514.mp3");
        assert_eq!(remote.kind(), SourceKind::RemoteUrl);
        assert!(remote.is_remote());
        assert_eq!(remote.location(), "https://example.com/2514.mp3");
    }

    #[test]
    fn test_audio_source_serializes_with_kind_tag() {
        let json = serde_json::to_value(AudioSource::local("angel.mp3")).unwrap();
        assert_eq!(json["kind"], "local_file");
        assert_eq!(json["path"], "angel.mp3");
    }

    #[test]
    fn test_options_builder_defaults() {
        let (callbacks, _rx) = PlayerCallbacks::channel(1);
        let options = PlayerOptions::new(AudioSource::local("a.mp3"), callbacks);
        assert!(!options.looping);
        assert!(!options.debug);

        let options = options.with_looping(true).with_debug(true);
        assert!(options.looping);
        assert!(options.debug);
    }

    #[core_async::test]
    async fn test_callbacks_are_tagged_with_session() {
        let (callbacks, mut rx) = PlayerCallbacks::channel(7);
        assert!(callbacks.info("buffering"));
        assert!(callbacks.completed());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.session_tag, 7);
        assert_eq!(
            first.event,
            PlayerEvent::Info {
                info: "buffering".to_string()
            }
        );
        assert_eq!(rx.recv().await.unwrap().event, PlayerEvent::Completed);
    }

    #[test]
    fn test_deliver_reports_dropped_receiver() {
        let (callbacks, rx) = PlayerCallbacks::channel(3);
        drop(rx);
        assert!(!callbacks.error("{\"code\":1}"));
    }
}
