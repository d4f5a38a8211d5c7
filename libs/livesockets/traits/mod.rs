//! # LiveSockets Traits
//!
//! Pluggable pieces of the client:
//!
//! - **MessageRouter**: Parse incoming WebSocket messages
//! - **MessageHandler**: Consume parsed messages in order
//! - **AuthProvider**: Produce the post-connect authentication message
//! - **ReconnectionStrategy**: Control reconnection behavior

pub mod auth;
pub mod error;
pub mod message;
pub mod reconnect;
pub mod router;

// Re-export commonly used types
pub use auth::{AuthProvider, NoAuth};
pub use error::{Result, SocketError};
pub use message::WsMessage;
pub use reconnect::{
    ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectTracker, ReconnectionStrategy,
};
pub use router::{MessageHandler, MessageRouter};
