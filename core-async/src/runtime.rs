//! Runtime utilities that wrap Tokio's runtime primitives so downstream
//! crates never depend on Tokio directly.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}

/// Like [`block_on`], but the runtime starts with its clock paused.
///
/// Timers only advance when every task is idle, which lets tests exercise
/// second-long polling intervals without waiting in real time. Used by
/// `#[core_async::test(start_paused)]`.
#[cfg(feature = "test-util")]
pub fn block_on_paused<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .expect("core_async::runtime::block_on_paused: failed to build Tokio runtime")
        .block_on(future)
}
