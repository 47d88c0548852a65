//! Connection identity and outbound queue.

use crate::domain::error::DeliveryError;
use serde::{Deserialize, Serialize};
use shared_types::Principal;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A serialized envelope, shared by every recipient of one publish.
pub type Frame = Arc<str>;

/// Opaque connection identifier.
///
/// Uses UUID v7 so identifiers sort by creation time in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cheap, cloneable handle to one authenticated connection.
///
/// The receiving half of the outbound queue is owned by the connection's
/// writer task; once that task ends every further delivery fails with
/// [`DeliveryError::Closed`].
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    principal: Arc<Principal>,
    outbound: mpsc::Sender<Frame>,
}

impl ConnectionHandle {
    /// Create a handle and the receiver its writer task drains.
    pub fn new(principal: Principal, buffer: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (outbound, rx) = mpsc::channel(buffer.max(1));
        let handle = Self {
            id: ConnectionId::new(),
            principal: Arc::new(principal),
            outbound,
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Queue a frame without waiting.
    pub fn try_deliver(&self, frame: &Frame) -> Result<(), DeliveryError> {
        self.outbound.try_send(Arc::clone(frame)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}
