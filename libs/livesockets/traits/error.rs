use thiserror::Error;

/// Main error type for livesockets
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SocketError {
    /// WebSocket protocol or I/O error on an established connection
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// A connect is already in flight (dialing or waiting to retry)
    #[error("Connection already in progress")]
    ConnectionInProgress,

    /// The socket is not open, nothing was written
    #[error("Not connected")]
    NotConnected,

    /// The dial itself failed (refused, DNS, handshake)
    #[error("Failed to connect: {0}")]
    Connect(String),

    /// Authentication message could not be prepared or was rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Message parsing error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic error
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for livesockets operations
pub type Result<T> = std::result::Result<T, SocketError>;
