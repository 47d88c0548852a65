//! SN-02 WebSocket Client - reconnecting consumer for the broadcast hub.
//!
//! # Behaviour
//!
//! - Fixed delay between attempts (default 5s)
//! - Gives up after N consecutive failures (default 5) and enters FAILED
//! - A successful connection resets the counter, joins the default room and
//!   re-sends every remembered subscription
//! - A refused handshake (bad credentials) is terminal
//!
//! # Usage
//!
//! ```ignore
//! use sn_02_ws_client::{ClientConfig, RealtimeClient};
//!
//! let client = RealtimeClient::new(ClientConfig::new(url, token));
//! let alerts = client.on("system:alert", |envelope| {
//!     println!("{}", envelope.data);
//!     Ok(())
//! });
//! client.subscribe("threats".parse()?);
//! client.connect();
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod connector;
pub mod dispatch;
pub mod error;
pub mod state;

pub use client::RealtimeClient;
pub use config::{ClientConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_RECONNECT_DELAY, DEFAULT_ROOM};
pub use connector::{Connection, Connector, FrameSink, FrameStream, TungsteniteConnector};
pub use dispatch::{ListenerHandle, ListenerRegistry};
pub use error::{ClientError, ListenerError};
pub use state::{ConnectionState, ReconnectPolicy, ReconnectTracker, RetryDecision};
