//! Tab-side volume synchronization over a WebSocket relay.
//!
//! A [`SyncClient`] owns the connection state machine and reconnect backoff.
//! It is driven by [`ClientEvent`]s and answers with [`Effect`]s, so it can be
//! exercised without a socket. [`SyncHandle::start`] runs it on a tokio task
//! against a real relay using `tokio-tungstenite`.

mod backoff;
mod client;
mod connection;
mod machine;
pub mod surface;
mod types;

pub use backoff::RetryDelay;
pub use client::SyncHandle;
pub use machine::SyncClient;
pub use surface::{MemoryHost, MemorySurface, SurfaceHost, SurfaceId, VideoSurface, VolumeObserver};
pub use types::{ClientEvent, ConnectionState, Effect, SyncOptions};
