//! Time-related abstractions backed by `tokio::time`.
//!
//! `Instant` is re-exported from Tokio rather than `std` so that it follows
//! the paused test clock.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(5)).await;
//!     assert!(start.elapsed() >= Duration::from_millis(5));
//! }
//! ```

pub use std::time::Duration;
pub use tokio::time::{
    interval, interval_at, sleep, timeout, Instant, Interval, MissedTickBehavior, Sleep, Timeout,
};

/// Creates an interval whose first tick fires one full `period` from now.
///
/// `tokio::time::interval` completes its first tick immediately; recurring
/// pollers usually want to wait a whole period before the first run.
pub fn delayed_interval(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

