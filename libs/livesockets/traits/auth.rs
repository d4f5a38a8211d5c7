use crate::traits::error::Result;
use crate::traits::message::WsMessage;
use async_trait::async_trait;

/// Trait for providing the post-connect authentication message
///
/// The socket is always opened unauthenticated. Right after the
/// transport-level open (including every reconnection) the client asks the
/// provider for a message and writes it before anything else.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Get the authentication message to send after connection
    ///
    /// # Returns
    /// * `Ok(Some(message))` - Send this message for authentication
    /// * `Ok(None)` - Nothing to send, the connection stays unauthenticated
    /// * `Err(SocketError)` - Authentication preparation failed, logged and skipped
    async fn auth_message(&self) -> Result<Option<WsMessage>>;
}

/// A no-op auth provider that doesn't require authentication
pub struct NoAuth;

#[async_trait]
impl AuthProvider for NoAuth {
    async fn auth_message(&self) -> Result<Option<WsMessage>> {
        Ok(None)
    }
}
