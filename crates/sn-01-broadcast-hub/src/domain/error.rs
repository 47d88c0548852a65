//! Hub error taxonomy.
//!
//! - [`AuthError`]: connection attempt refused, terminal for that attempt
//! - [`ProviderError`]: snapshot failed, the cycle is skipped
//! - [`DeliveryError`]: frame could not be queued, dropped silently
//! - [`HubError`]: service-level failures (config, bind, serve)

use crate::domain::config::ConfigError;
use axum::http::StatusCode;
use shared_types::SnapshotKind;

/// Why a connection attempt was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("authentication token required")]
    MissingToken,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("unknown principal")]
    UnknownPrincipal,
    #[error("inactive principal")]
    InactivePrincipal,
    #[error("user lookup failed: {0}")]
    Lookup(String),
}

impl AuthError {
    /// Response body sent to the refused client.
    pub fn reason(&self) -> String {
        format!("authentication failed: {}", self)
    }

    /// 401 for bad credentials; a directory outage is the hub's problem,
    /// so the client may retry.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Lookup(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Data provider failure for one snapshot call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("{kind} snapshot unavailable: {reason}")]
    Unavailable { kind: SnapshotKind, reason: String },
    #[error("{kind} snapshot not supported")]
    Unsupported { kind: SnapshotKind },
}

impl ProviderError {
    pub fn unavailable(kind: SnapshotKind, reason: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            kind,
            reason: reason.into(),
        }
    }
}

/// User directory lookup failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("user store error: {0}")]
pub struct StoreError(pub String);

/// Outbound queue rejected a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("outbound queue full")]
    QueueFull,
    #[error("connection closed")]
    Closed,
}

/// Registry operation on a connection it does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown connection: {0}")]
    UnknownConnection(crate::domain::connection::ConnectionId),
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Listener could not be bound
    #[error("server bind error: {0}")]
    Bind(String),

    /// Server stopped with an error
    #[error("server error: {0}")]
    Serve(String),

    /// Envelope serialization failed
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
