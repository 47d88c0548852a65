//! Client error types.

/// Client-side failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Could not open the WebSocket
    #[error("connect failed: {0}")]
    Connect(String),

    /// Established connection failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Peer closed the connection
    #[error("connection closed")]
    Closed,

    /// Hub refused the credentials (HTTP 401 or close code 1008)
    #[error("connection rejected: {0}")]
    Rejected(String),

    /// No live connection to send on
    #[error("not connected")]
    NotConnected,

    /// Gave up after the configured number of consecutive failures
    #[error("reconnection failed after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// Outbound message could not be encoded
    #[error("encode error: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Encode(e.to_string())
    }
}

/// Error a listener callback may return; logged, never propagated.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;
