//! SN-01 Broadcast Hub - authenticated real-time publish/subscribe.
//!
//! Pushes periodic snapshots and event-driven alerts to dashboard clients
//! over WebSocket, partitioned by topic ("rooms").
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     BROADCAST HUB (sn-01)                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  GET /ws?token=…        GET /health        GET /stats            │
//! │        │                                                          │
//! │  ┌─────┴──────────┐   ┌───────────────────────────────────────┐  │
//! │  │ Authenticator  │   │           Topic Registry              │  │
//! │  │ HS256 + store  │   │  topic → conns, conn → topics (RwLock) │  │
//! │  └─────┬──────────┘   └───────▲────────────────▲──────────────┘  │
//! │        │ Principal            │ members_of     │ all_connections │
//! │  ┌─────┴──────────┐   ┌───────┴────────┐ ┌─────┴─────────────┐   │
//! │  │ WS handler     │   │ Periodic       │ │ Event Publisher   │   │
//! │  │ reader/writer  │   │ one timer/feed │ │ alert broadcasts  │   │
//! │  └─────▲──────────┘   └───────┬────────┘ └─────┬─────────────┘   │
//! │        │ bounded mpsc queue   │                │                  │
//! │        └──────────────────────┴────────────────┘                  │
//! └──────────────────────────────────────────────────────────────────┘
//!                 ▲                              ▲
//!            DataProvider                    UserStore
//! ```
//!
//! # Delivery
//!
//! Each connection owns one bounded outbound queue drained by its writer
//! task. Publishers never wait: a full queue drops the frame for that
//! connection, a closed one removes the connection from every topic.
//!
//! # Usage
//!
//! ```ignore
//! use sn_01_broadcast_hub::{HubConfig, HubService};
//!
//! let service = HubService::new(config, user_store, data_provider)?;
//! let alerts = service.events();
//! service.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod auth;
pub mod domain;
pub mod hub;
pub mod ports;
pub mod publisher;
pub mod registry;
pub mod service;
pub mod ws;

// Re-exports
pub use auth::{Authenticator, Claims, TokenSigner, TokenVerifier};
pub use domain::config::{
    Audience, AuthConfig, ConfigError, FeedConfig, HubConfig, ServerConfig, WebSocketConfig,
};
pub use domain::connection::{ConnectionHandle, ConnectionId, Frame};
pub use domain::error::{
    AuthError, DeliveryError, HubError, ProviderError, RegistryError, StoreError,
};
pub use hub::BroadcastHub;
pub use ports::{DataProvider, FixedTimeSource, SystemTimeSource, TimeSource, UserRecord, UserStore};
pub use publisher::{CycleOutcome, DeliveryReport, EventPublisher, PeriodicPublisher};
pub use registry::TopicRegistry;
pub use service::HubService;
