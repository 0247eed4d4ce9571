//! Synchronization primitives.
//!
//! Async-aware locks and channels come from `tokio::sync`; cooperative
//! cancellation comes from `tokio_util::sync::CancellationToken`.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{CancellationToken, Mutex};
//!
//! async fn example() {
//!     let mutex = Mutex::new(42);
//!     *mutex.lock().await += 1;
//!
//!     let token = CancellationToken::new();
//!     let child = token.child_token();
//!     token.cancel();
//!     assert!(child.is_cancelled());
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};
pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
