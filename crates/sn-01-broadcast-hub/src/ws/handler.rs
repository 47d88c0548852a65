//! WebSocket connection handler.
//!
//! Security features:
//! - Authentication before any topic join
//! - Inbound message size limit
//! - Per-connection inbound rate limit

use crate::domain::config::WebSocketConfig;
use crate::domain::connection::{ConnectionHandle, ConnectionId, Frame};
use crate::domain::error::DeliveryError;
use crate::hub::BroadcastHub;
use crate::publisher::delivery;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use shared_types::envelope::codes;
use shared_types::{Envelope, ErrorFrame, Principal};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Handler for one authenticated WebSocket connection
pub struct WebSocketHandler {
    hub: Arc<BroadcastHub>,
    principal: Principal,
    config: WebSocketConfig,
    /// Message counter for rate limiting
    message_count: u32,
    /// Rate limit window start
    rate_limit_window: Instant,
}

impl WebSocketHandler {
    pub fn new(hub: Arc<BroadcastHub>, principal: Principal, config: WebSocketConfig) -> Self {
        Self {
            hub,
            principal,
            config,
            message_count: 0,
            rate_limit_window: Instant::now(),
        }
    }

    /// Check rate limit, returns true if the message is allowed
    fn check_rate_limit(&mut self) -> bool {
        let now = Instant::now();

        // Reset window every second
        if now.duration_since(self.rate_limit_window) >= Duration::from_secs(1) {
            self.rate_limit_window = now;
            self.message_count = 0;
        }

        self.message_count += 1;
        self.message_count <= self.config.rate_limit
    }

    /// Check message size, returns an error envelope if too large
    fn check_message_size(&self, size: usize) -> Option<Envelope> {
        if size <= self.config.max_message_size {
            return None;
        }
        Some(Envelope::error(&ErrorFrame::new(
            codes::MESSAGE_TOO_LARGE,
            format!(
                "Message too large: {} bytes (max: {})",
                size, self.config.max_message_size
            ),
        )))
    }

    /// Decide the reply for one inbound text payload.
    fn on_text(&mut self, handle: &ConnectionHandle, text: &str) -> Option<Envelope> {
        if let Some(error) = self.check_message_size(text.len()) {
            warn!(
                connection_id = %handle.id(),
                size = text.len(),
                max = self.config.max_message_size,
                "Message exceeds size limit"
            );
            return Some(error);
        }

        if !self.check_rate_limit() {
            return Some(Envelope::error(&ErrorFrame::new(
                codes::RATE_LIMITED,
                "Rate limit exceeded",
            )));
        }

        self.hub.handle_text(handle.id(), text)
    }

    /// Serve the connection until the peer goes away.
    pub async fn handle(mut self, socket: WebSocket) {
        let (handle, outbound) = self.hub.open_session(self.principal.clone()).await;
        let (sink, mut stream) = socket.split();
        let writer = tokio::spawn(write_loop(sink, outbound, handle.id()));

        while let Some(result) = stream.next().await {
            let reply = match result {
                Ok(Message::Text(text)) => self.on_text(&handle, &text),
                Ok(Message::Binary(data)) => match String::from_utf8(data) {
                    Ok(text) => self.on_text(&handle, &text),
                    Err(_) => Some(Envelope::error(&ErrorFrame::new(
                        codes::INVALID_MESSAGE,
                        "Binary frames must be UTF-8 JSON",
                    ))),
                },
                // Pings are answered by the protocol layer
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
                Ok(Message::Close(_)) => {
                    debug!(connection_id = %handle.id(), "WebSocket close received");
                    break;
                }
                Err(e) => {
                    warn!(connection_id = %handle.id(), error = %e, "WebSocket error");
                    break;
                }
            };

            if let Some(reply) = reply {
                if !queue_reply(&handle, &reply) {
                    break;
                }
            }
        }

        // Cleanup membership on disconnect
        self.hub.close(handle.id());
        writer.abort();
    }
}

/// Queue a reply behind any pending pushes. Returns false once the writer
/// is gone; a full queue only costs this reply.
fn queue_reply(handle: &ConnectionHandle, reply: &Envelope) -> bool {
    let frame = match delivery::encode(reply) {
        Ok(frame) => frame,
        Err(e) => {
            error!(error = %e, "Failed to encode reply");
            return true;
        }
    };

    match handle.try_deliver(&frame) {
        Ok(()) => true,
        Err(DeliveryError::QueueFull) => {
            warn!(
                connection_id = %handle.id(),
                reply = %reply.kind,
                "Outbound queue full, dropping reply"
            );
            true
        }
        Err(DeliveryError::Closed) => false,
    }
}

/// Drain the connection's outbound queue into the socket.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Frame>,
    connection_id: ConnectionId,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = sink.send(Message::Text(frame.to_string())).await {
            debug!(connection_id = %connection_id, error = %e, "Socket send failed");
            break;
        }
    }
    let _ = sink.close().await;
}
