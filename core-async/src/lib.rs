//! Async abstraction layer for the audio session core.
//!
//! Every other crate in the workspace goes through this crate instead of
//! naming Tokio directly, so the executor, timer and synchronization choices
//! live in one place.
//!
//! # Modules
//!
//! - `task`: Task spawning and join handles
//! - `time`: Sleep, intervals and timeouts
//! - `sync`: Locks, channels and cooperative cancellation
//! - `runtime`: Runtime handles and `block_on`
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

/// Waits on several branches and runs the first to complete.
pub use tokio::select;

pub use sync::CancellationToken;
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
