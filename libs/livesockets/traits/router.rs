//! Message Routing
//!
//! Inbound frames are parsed by a [`MessageRouter`] and handed to a single
//! [`MessageHandler`] on the connection task itself:
//!
//! ```text
//! WebSocket → read loop → Router::parse → Handler::handle
//!                                  ↓
//!                          (arrival order, one at a time)
//! ```
//!
//! # Ordering Guarantees
//!
//! - **Sequential**: frames reach the handler in the order the transport read them
//! - **No reordering buffer**: nothing is held back or replayed across reconnects

use crate::{Result, WsMessage};
use async_trait::async_trait;
use std::fmt::Debug;

/// Parses raw WebSocket messages into typed messages
///
/// # Example
///
/// ```ignore
/// struct ChatRouter;
///
/// #[async_trait]
/// impl MessageRouter for ChatRouter {
///     type Message = ChatFrame;
///
///     async fn parse(&self, message: WsMessage) -> Result<Self::Message> {
///         let text = message.as_text().ok_or_else(|| SocketError::ParseError("binary".into()))?;
///         serde_json::from_str(text).map_err(|e| SocketError::ParseError(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait MessageRouter: Send + Sync + 'static {
    /// The parsed message type
    type Message: Send + Debug + 'static;

    /// Parse a raw WebSocket message into a typed message
    ///
    /// Parse errors are logged by the client and the frame is dropped;
    /// they never tear the connection down.
    async fn parse(&self, message: WsMessage) -> Result<Self::Message>;
}

/// Processes parsed messages in arrival order
///
/// Runs inline on the connection task, so implementations must not block.
pub trait MessageHandler<M>: Send + Sync + 'static
where
    M: Send + Debug + 'static,
{
    /// Handle a parsed message
    ///
    /// # Errors
    /// Errors are logged and the next message is processed as usual.
    fn handle(&self, message: M) -> Result<()>;

    /// Called whenever the transport opens (`true`) or closes (`false`)
    fn on_connection_change(&self, _connected: bool) {}
}
