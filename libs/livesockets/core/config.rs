use crate::traits::*;
use std::sync::Arc;

/// Configuration for WebSocketClient
///
/// Built by [`WebSocketClientBuilder`](crate::WebSocketClientBuilder); the
/// reconnection strategy is handed to a fresh tracker for every connection
/// task, so a manual reconnect after giving up starts with a full budget.
pub struct ClientConfig<R>
where
    R: MessageRouter,
{
    /// WebSocket URL (wss:// or ws://)
    pub(crate) url: String,

    /// Router for parsing inbound messages
    pub(crate) router: Arc<R>,

    /// Consumer of parsed messages
    pub(crate) handler: Arc<dyn MessageHandler<R::Message>>,

    /// Optional authentication provider
    pub(crate) auth: Option<Arc<dyn AuthProvider>>,

    /// Reconnection strategy factory
    pub(crate) reconnect_strategy: Arc<dyn Fn() -> Box<dyn ReconnectionStrategy> + Send + Sync>,
}

impl<R> ClientConfig<R>
where
    R: MessageRouter,
{
    /// Get a reference to the URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        self.auth.is_some()
    }

    pub(crate) fn new_tracker(&self) -> ReconnectTracker {
        ReconnectTracker::new((self.reconnect_strategy)())
    }
}
