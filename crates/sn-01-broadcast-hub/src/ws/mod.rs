//! WebSocket transport.
//!
//! The bearer token is read from `?token=` or an `Authorization: Bearer`
//! header and verified before the upgrade. A rejected attempt is answered
//! with a plain HTTP error, never upgrades and is never registered.

pub mod handler;

pub use handler::WebSocketHandler;

use crate::auth::Authenticator;
use crate::domain::config::WebSocketConfig;
use crate::hub::BroadcastHub;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// State shared by every upgrade request.
#[derive(Clone)]
pub struct WsState {
    pub hub: Arc<BroadcastHub>,
    pub authenticator: Arc<Authenticator>,
    pub config: WebSocketConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// Token from the query string, falling back to the Authorization header.
pub fn extract_token(params: &ConnectParams, headers: &HeaderMap) -> Option<String> {
    params.token.clone().or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    })
}

/// `GET <ws_path>` upgrade handler.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<WsState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
) -> Response {
    let token = extract_token(&params, &headers);

    match state.authenticator.authenticate(token.as_deref()).await {
        Ok(principal) => ws.on_upgrade(move |socket| async move {
            let handler = WebSocketHandler::new(state.hub, principal, state.config);
            handler.handle(socket).await;
        }),
        Err(e) => {
            info!(reason = %e, "Rejected connection attempt");
            (e.status(), e.reason()).into_response()
        }
    }
}
