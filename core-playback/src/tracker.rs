//! # Duration Tracker
//!
//! Periodic poller behind the remaining-time display. The first tick fires
//! one full period after [`DurationTracker::start`]; the task ends when the
//! handle is cancelled or dropped, or when the tick callback breaks.

use crate::session::duration_to_ms;
use core_async::sync::CancellationToken;
use core_async::task::{self, JoinHandle};
use core_async::time::{self, Duration};
use std::ops::ControlFlow;
use tracing::trace;

/// Handle to a running tracking task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct DurationTracker {
    token: CancellationToken,
    handle: JoinHandle<()>,
    period: Duration,
}

impl DurationTracker {
    /// Spawns the tracking task. `on_tick` runs once per `period` until it
    /// returns [`ControlFlow::Break`].
    ///
    /// # Panics
    ///
    /// Panics when called outside of a runtime context.
    pub fn start<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = task::spawn(async move {
            let mut ticker = time::delayed_interval(period);
            loop {
                core_async::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        if on_tick().is_break() {
                            break;
                        }
                    }
                }
            }
            trace!(period_ms = duration_to_ms(period), "Duration tracking ended");
        });

        Self {
            token,
            handle,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stops the task before its next tick.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// `true` once the task has exited, whether cancelled or broken out.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for DurationTracker {
    fn drop(&mut self) {
        self.token.cancel();
        self.handle.abort();
    }
}
