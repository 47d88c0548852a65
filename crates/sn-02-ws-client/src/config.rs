//! Client configuration.

use std::time::Duration;

/// Default fixed delay between reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default number of consecutive failed attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Room joined on every successful connection.
pub const DEFAULT_ROOM: &str = "dashboard";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hub WebSocket endpoint, e.g. `ws://localhost:3001/ws`
    pub url: String,
    /// Access token presented at handshake
    pub token: Option<String>,
    pub reconnect_delay: Duration,
    pub max_attempts: u32,
    /// Joined on connect; `None` joins nothing
    pub default_room: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:3001/ws".to_string(),
            token: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            default_room: Some(DEFAULT_ROOM.to_string()),
        }
    }
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Endpoint with the token appended as a `token` query parameter.
    pub fn connect_url(&self) -> String {
        match &self.token {
            Some(token) => {
                let sep = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{}token={}", self.url, sep, token)
            }
            None => self.url.clone(),
        }
    }
}
