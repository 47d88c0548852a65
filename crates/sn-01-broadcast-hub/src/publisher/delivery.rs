//! Frame encoding and best-effort fan-out.

use crate::domain::config::Audience;
use crate::domain::connection::{ConnectionHandle, Frame};
use crate::domain::error::DeliveryError;
use crate::registry::TopicRegistry;
use serde_json::Value;
use shared_types::Envelope;
use std::sync::Arc;
use tracing::{debug, warn};

/// Serialize an envelope once for every recipient.
pub fn encode(envelope: &Envelope) -> Result<Frame, serde_json::Error> {
    envelope.to_json().map(Arc::from)
}

/// Build and serialize a `{type, data, timestamp}` frame.
pub fn frame(event: &str, data: Value) -> Result<Frame, serde_json::Error> {
    encode(&Envelope::new(event, data))
}

/// Snapshot of the connections an audience currently resolves to.
pub fn recipients(registry: &TopicRegistry, audience: &Audience) -> Vec<ConnectionHandle> {
    match audience {
        Audience::All => registry.all_connections(),
        Audience::Topic(topic) => registry.members_of(topic),
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Frames queued
    pub delivered: usize,
    /// Frames dropped on a full queue
    pub dropped: usize,
    /// Recipients found closed and removed from the registry
    pub closed: usize,
}

/// Queue `frame` on every handle without waiting.
///
/// A full queue drops the frame for that connection only. A closed queue
/// means the connection is gone; it is removed from the registry so no
/// later publish is attributed to it.
pub fn deliver(
    registry: &TopicRegistry,
    recipients: &[ConnectionHandle],
    frame: &Frame,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for handle in recipients {
        match handle.try_deliver(frame) {
            Ok(()) => report.delivered += 1,
            Err(DeliveryError::QueueFull) => {
                warn!(
                    connection_id = %handle.id(),
                    "Outbound queue full, dropping frame"
                );
                report.dropped += 1;
            }
            Err(DeliveryError::Closed) => {
                debug!(connection_id = %handle.id(), "Recipient closed, removing");
                registry.closed(handle.id());
                report.closed += 1;
            }
        }
    }

    report
}
