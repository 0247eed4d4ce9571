//! Marker traits that keep bridge trait bounds in one place.
//!
//! Host adapters are shared across async tasks behind `Arc`, so every bridge
//! trait requires `Send + Sync`. Naming the bound once lets a single-threaded
//! host build relax it without touching every trait definition.

/// Marker trait for `Send + Sync` bridge implementations.
pub trait PlatformSendSync: Send + Sync {}

impl<T> PlatformSendSync for T where T: Send + Sync {}
