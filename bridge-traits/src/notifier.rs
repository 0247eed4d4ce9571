//! User-facing notices.
//!
//! The controller never shows dialogs itself. Completion notices, info
//! callbacks and error reports go through a host-supplied [`UserNotifier`],
//! which a mobile shell maps to an alert and a test maps to a `Vec`.

use crate::platform::PlatformSendSync;

pub trait UserNotifier: PlatformSendSync {
    /// Show a short message to the user.
    fn notify(&self, message: &str);

    /// Report a failure. Hosts typically log it and may also surface it.
    fn log_error(&self, message: &str);
}

/// Notifier that writes everything to `tracing`. Used when the host does not
/// inject one.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl UserNotifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(target: "user_notice", "{}", message);
    }

    fn log_error(&self, message: &str) {
        tracing::error!(target: "user_notice", "{}", message);
    }
}
