//! # LiveSockets
//!
//! A single-connection WebSocket client for long-lived realtime sessions.
//!
//! ## Features
//!
//! - **One logical connection**: `connect` is idempotent while open and refuses overlapping dials
//! - **Post-connect auth**: the socket opens unauthenticated, an [`AuthProvider`] supplies the first frame
//! - **Bounded reconnection**: pluggable strategy, counter reset on every successful open
//! - **Ordered delivery**: frames reach the handler in the order they were read
//! - **At-most-once sends**: writes while not open are rejected, never queued

pub mod core;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    builder::{states, WebSocketClientBuilder},
    client::{ClientEvent, Metrics, WebSocketClient, EVENT_QUEUE_CAPACITY},
    config::ClientConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
};

// Convenience function
pub use self::core::builder;
