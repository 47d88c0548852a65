//! Hub configuration with validation.

use serde::{Deserialize, Serialize};
use shared_types::{events, SnapshotKind, Topic};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main hub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// HTTP/WebSocket listener
    pub server: ServerConfig,
    /// Per-connection WebSocket limits
    pub websocket: WebSocketConfig,
    /// Token verification
    pub auth: AuthConfig,
    /// Periodic feeds, one independent timer each
    pub feeds: Vec<FeedConfig>,
    /// How often connection statistics are logged
    #[serde(with = "humantime_serde")]
    pub stats_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            websocket: WebSocketConfig::default(),
            auth: AuthConfig::default(),
            feeds: FeedConfig::defaults(),
            stats_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl HubConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        if !self.server.ws_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "ws_path must start with '/': {}",
                self.server.ws_path
            )));
        }

        if self.websocket.max_message_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_message_size cannot be 0".into(),
            ));
        }

        if self.websocket.message_buffer_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "message_buffer_size cannot be 0".into(),
            ));
        }

        if self.websocket.rate_limit == 0 {
            return Err(ConfigError::InvalidLimit("rate_limit cannot be 0".into()));
        }

        if self.stats_interval.is_zero() {
            return Err(ConfigError::InvalidInterval("stats_interval".into()));
        }

        let mut names = HashSet::new();
        for feed in &self.feeds {
            if feed.interval.is_zero() {
                return Err(ConfigError::InvalidInterval(feed.event.clone()));
            }
            if !names.insert(feed.event.as_str()) {
                return Err(ConfigError::DuplicateFeed(feed.event.clone()));
            }
        }

        Ok(())
    }

    /// Listener bind address
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 3001)
    pub port: u16,
    /// Allowed browser origin for CORS
    pub cors_origin: String,
    /// Route the WebSocket upgrade is served on
    pub ws_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3001,
            cors_origin: "http://localhost:3000".to_string(),
            ws_path: "/ws".to_string(),
        }
    }
}

/// Per-connection WebSocket limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Maximum inbound message size in bytes
    pub max_message_size: usize,
    /// Inbound messages per second per connection
    pub rate_limit: u32,
    /// Outbound frames queued per connection before frames are dropped
    pub message_buffer_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: 64 * 1024,
            rate_limit: 50,
            message_buffer_size: 256,
        }
    }
}

/// Token verification settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret shared with the REST API that issues access tokens
    pub jwt_secret: String,
    /// Clock skew tolerated when checking `exp`
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            leeway: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("leeway", &self.leeway)
            .finish()
    }
}

/// Who receives a feed's snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// Every authenticated connection
    All,
    /// Current members of one topic
    Topic(Topic),
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Audience::All => f.write_str("*"),
            Audience::Topic(topic) => write!(f, "{}", topic),
        }
    }
}

/// One periodic feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Event name sent on the wire
    pub event: String,
    /// Snapshot requested from the data provider
    pub kind: SnapshotKind,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    pub audience: Audience,
}

impl FeedConfig {
    pub fn new(
        event: impl Into<String>,
        kind: SnapshotKind,
        interval: Duration,
        audience: Audience,
    ) -> Self {
        Self {
            event: event.into(),
            kind,
            interval,
            audience,
        }
    }

    /// The five feeds the dashboard consumes.
    pub fn defaults() -> Vec<FeedConfig> {
        vec![
            FeedConfig::new(
                events::SECURITY_METRICS_UPDATE,
                SnapshotKind::Overview,
                Duration::from_secs(30),
                Audience::All,
            ),
            FeedConfig::new(
                events::THREATS_UPDATE,
                SnapshotKind::Threats,
                Duration::from_secs(10),
                Audience::Topic(Topic::Threats),
            ),
            FeedConfig::new(
                events::FRAUD_UPDATE,
                SnapshotKind::Fraud,
                Duration::from_secs(15),
                Audience::Topic(Topic::Fraud),
            ),
            FeedConfig::new(
                events::BLOCKCHAIN_UPDATE,
                SnapshotKind::Blockchain,
                Duration::from_secs(20),
                Audience::Topic(Topic::Blockchain),
            ),
            FeedConfig::new(
                events::BIOMETRIC_UPDATE,
                SnapshotKind::Biometric,
                Duration::from_secs(25),
                Audience::Topic(Topic::Biometric),
            ),
        ]
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No token secret configured
    #[error("jwt secret is not set")]
    MissingSecret,
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Zero interval
    #[error("interval for {0} cannot be 0")]
    InvalidInterval(String),
    /// Two feeds share an event name
    #[error("duplicate feed: {0}")]
    DuplicateFeed(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Duration (de)serialization as "30s", "500ms", "5m" or plain seconds
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() != 0 {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        } else {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            let mins = mins.trim().parse::<u64>().map_err(|_| "invalid minutes")?;
            mins.checked_mul(60)
                .map(Duration::from_secs)
                .ok_or("minutes out of range")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
