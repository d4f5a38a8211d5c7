//! Connection machinery: builder, client handle, config and lock-free state

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;

// Re-export main types
pub use builder::{states, WebSocketClientBuilder};
pub use client::{ClientEvent, Metrics, WebSocketClient, EVENT_QUEUE_CAPACITY};
pub use config::ClientConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};

/// Create a new WebSocket client builder
///
/// # Example
/// ```ignore
/// let client = livesockets::builder()
///     .url("ws://localhost:8080/ws")
///     .router(FrameRouter, handler)
///     .auth(TokenAuth::new(tokens))
///     .reconnect_strategy(FixedDelay::new(Duration::from_secs(5), Some(5)))
///     .build()?;
///
/// client.connect().await?;
/// ```
pub fn builder() -> WebSocketClientBuilder<builder::states::NoUrl, builder::states::NoRouter, ()> {
    WebSocketClientBuilder::new()
}
