//! Domain layer: configuration, connection identity and errors.

pub mod config;
pub mod connection;
pub mod error;

pub use config::{Audience, AuthConfig, ConfigError, FeedConfig, HubConfig};
pub use connection::{ConnectionHandle, ConnectionId, Frame};
pub use error::{AuthError, DeliveryError, HubError, ProviderError, RegistryError, StoreError};
