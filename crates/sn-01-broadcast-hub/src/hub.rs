//! Broadcast hub core: session lifecycle and client message handling.
//!
//! Transport-agnostic. The WebSocket handler owns the socket; everything
//! it needs to decide lives here so it can be exercised without one.

use crate::domain::connection::{ConnectionHandle, ConnectionId, Frame};
use crate::ports::DataProvider;
use crate::publisher::{delivery, EventPublisher, PeriodicPublisher};
use crate::registry::TopicRegistry;
use shared_types::envelope::codes;
use shared_types::{events, ClientMessage, Envelope, ErrorFrame, Principal, SnapshotKind, Topic};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One-shot pushes sent to a freshly authenticated connection, in order.
const INITIAL_SNAPSHOTS: [(&str, SnapshotKind); 2] = [
    (events::SECURITY_OVERVIEW, SnapshotKind::Overview),
    (events::ALERTS_RECENT, SnapshotKind::RecentAlerts),
];

pub struct BroadcastHub {
    registry: Arc<TopicRegistry>,
    provider: Arc<dyn DataProvider>,
    events: EventPublisher,
    periodic: Arc<PeriodicPublisher>,
    buffer_size: usize,
}

impl BroadcastHub {
    pub fn new(provider: Arc<dyn DataProvider>, buffer_size: usize) -> Self {
        let registry = Arc::new(TopicRegistry::new());
        Self {
            events: EventPublisher::new(Arc::clone(&registry)),
            periodic: Arc::new(PeriodicPublisher::new(
                Arc::clone(&registry),
                Arc::clone(&provider),
            )),
            registry,
            provider,
            buffer_size,
        }
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    /// Publisher for alert broadcasts and targeted pushes.
    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub fn periodic(&self) -> &Arc<PeriodicPublisher> {
        &self.periodic
    }

    /// Admit an authenticated principal.
    ///
    /// Queues the initial overview and alert backlog on the new connection
    /// before it is registered, so no publish can overtake them. Then
    /// registers it and joins its `role:` and `user:` topics. The returned
    /// receiver must be drained by the connection's writer.
    pub async fn open_session(&self, principal: Principal) -> (ConnectionHandle, mpsc::Receiver<Frame>) {
        let (handle, rx) = ConnectionHandle::new(principal, self.buffer_size);

        for (event, kind) in INITIAL_SNAPSHOTS {
            self.push_initial(&handle, event, kind).await;
        }

        self.registry.register(handle.clone());
        let principal = handle.principal();
        for topic in [Topic::role(principal.role), Topic::user(principal.id.clone())] {
            // Registered above; cannot be unknown unless already closed
            if let Err(e) = self.registry.join(handle.id(), topic) {
                debug!(error = %e, "Connection closed during session setup");
            }
        }

        info!(
            connection_id = %handle.id(),
            principal = %handle.principal(),
            connections = self.registry.connection_count(),
            "Session opened"
        );
        (handle, rx)
    }

    async fn push_initial(&self, handle: &ConnectionHandle, event: &str, kind: SnapshotKind) {
        let snapshot = match self.provider.snapshot(kind).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                warn!(connection_id = %handle.id(), event, error = %e, "Initial snapshot failed");
                return;
            }
        };

        let frame = match delivery::frame(event, snapshot.into_payload()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(event, error = %e, "Failed to encode initial snapshot");
                return;
            }
        };
        // Not registered yet, so there is nothing to clean up on failure
        if let Err(e) = handle.try_deliver(&frame) {
            warn!(connection_id = %handle.id(), event, error = %e, "Initial snapshot dropped");
        }
    }

    /// Forget a connection. Safe to call more than once.
    pub fn close(&self, id: ConnectionId) {
        let topics = self.registry.closed(id);
        info!(
            connection_id = %id,
            topics = topics.len(),
            connections = self.registry.connection_count(),
            "Session closed"
        );
    }

    /// Handle one inbound text frame; returns the reply to send, if any.
    pub fn handle_text(&self, id: ConnectionId, text: &str) -> Option<Envelope> {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                let error = ErrorFrame::new(codes::PARSE_ERROR, format!("Parse error: {}", e));
                return Some(Envelope::error(&error));
            }
        };

        let message = match ClientMessage::from_envelope(&envelope) {
            Ok(message) => message,
            Err(e) => return Some(Envelope::error(&ErrorFrame::from(&e))),
        };

        match self.handle_message(id, message) {
            Ok(reply) => reply,
            Err(error) => Some(Envelope::error(&error)),
        }
    }

    /// Apply a parsed client message.
    pub fn handle_message(
        &self,
        id: ConnectionId,
        message: ClientMessage,
    ) -> Result<Option<Envelope>, ErrorFrame> {
        match message {
            ClientMessage::JoinRoom(topic) | ClientMessage::Subscribe(topic) => {
                ensure_explicit(&topic)?;
                self.registry
                    .join(id, topic)
                    .map_err(|e| ErrorFrame::new(codes::INVALID_MESSAGE, e.to_string()))?;
                Ok(None)
            }
            ClientMessage::LeaveRoom(topic) | ClientMessage::Unsubscribe(topic) => {
                ensure_explicit(&topic)?;
                self.registry.leave(id, &topic);
                Ok(None)
            }
            ClientMessage::Ping(data) => Ok(Some(Envelope::new(events::PONG, data))),
        }
    }

    pub fn connected_count(&self) -> usize {
        self.registry.connection_count()
    }

    /// Connection ids currently authenticated as `principal_id`.
    pub fn connections_for_principal(&self, principal_id: &str) -> Vec<ConnectionId> {
        self.registry
            .connections_for_principal(principal_id)
            .iter()
            .map(ConnectionHandle::id)
            .collect()
    }
}

fn ensure_explicit(topic: &Topic) -> Result<(), ErrorFrame> {
    if topic.is_implicit() {
        return Err(ErrorFrame::new(
            codes::FORBIDDEN_TOPIC,
            format!("topic {} is assigned by the server", topic),
        ));
    }
    Ok(())
}
