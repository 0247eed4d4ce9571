//! # Playback Error Types
//!
//! Errors returned by the playback session controller. Player failures and
//! rejected arguments are logged and passed to the user notifier before they
//! are returned; `InvalidState`, `Cancelled` and `LoadFailed` are only
//! returned.

use crate::session::PlaybackState;
use bridge_traits::BridgeError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Player Errors
    // ========================================================================
    /// The player capability rejected a request.
    #[error("Player failed to {operation}: {source}")]
    DelegateFailure {
        operation: &'static str,
        #[source]
        source: BridgeError,
    },

    /// The player reported a failure through its error callback.
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    /// The error callback fired before `play` finished loading. Carries the
    /// message already recorded on the session.
    #[error("Track failed while loading: {0}")]
    LoadFailed(String),

    // ========================================================================
    // Control Errors
    // ========================================================================
    /// Operation is not valid in the current state. Nothing was changed.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        state: PlaybackState,
        operation: &'static str,
    },

    /// Invalid volume value (must be in range [0.0, 1.0]).
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f32),

    /// Speed multiplier outside the supported set.
    #[error("Unsupported playback speed: {0} (supported: 1.0, 1.5, 2.0)")]
    UnsupportedSpeed(f32),

    /// Seek position is beyond the end of the track.
    #[error("Seek position out of bounds: {0:?}")]
    SeekOutOfBounds(Duration),

    /// The request was overtaken by a concurrent transition, such as `stop`
    /// during loading.
    #[error("Request superseded before it completed")]
    Cancelled,

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Invalid playback configuration: {0}")]
    Config(String),
}

impl PlaybackError {
    /// Returns `true` if the session is still usable and the caller can retry
    /// or adjust the request.
    ///
    /// `PlaybackFailed` and `LoadFailed` leave the session in `Error`; it
    /// needs a new `play`.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PlaybackError::PlaybackFailed(_)
                | PlaybackError::LoadFailed(_)
                | PlaybackError::Config(_)
        )
    }

    /// Operation that failed or was refused, when the error names one.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            PlaybackError::DelegateFailure { operation, .. }
            | PlaybackError::InvalidState { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    pub(crate) fn delegate(operation: &'static str) -> impl FnOnce(BridgeError) -> Self {
        move |source| PlaybackError::DelegateFailure { operation, source }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_message() {
        let err = PlaybackError::InvalidState {
            state: PlaybackState::Idle,
            operation: "pause",
        };
        assert_eq!(err.to_string(), "Cannot pause while idle");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_delegate_failure_keeps_source() {
        let err = PlaybackError::delegate("play")(BridgeError::OperationFailed(
            "decoder crashed".into(),
        ));
        assert_eq!(err.operation(), Some("play"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("decoder crashed"));
    }

    #[test]
    fn test_callback_failure_is_not_recoverable() {
        assert!(!PlaybackError::PlaybackFailed("{}".into()).is_recoverable());
        assert!(!PlaybackError::LoadFailed("{}".into()).is_recoverable());
        assert!(PlaybackError::Cancelled.is_recoverable());
        assert!(PlaybackError::InvalidVolume(1.5).is_recoverable());
    }
}
