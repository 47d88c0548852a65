//! # Shared Types Crate
//!
//! Types that cross the WebSocket boundary between the broadcast hub and
//! its consumers.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: event names, topic names and payload shapes
//!   are defined once here and used by both sides.
//! - **One Envelope**: every frame in either direction is an [`Envelope`]
//!   (`{type, data, timestamp}`).
//! - **Typed Topics**: topic strings are parsed into [`Topic`] at the edge;
//!   implicit `role:` and `user:` topics are distinct variants so they can
//!   never be confused with free-form rooms.

pub mod alerts;
pub mod envelope;
pub mod principal;
pub mod snapshot;
pub mod topic;

pub use alerts::*;
pub use envelope::{events, ClientMessage, Envelope, ErrorFrame, ParseMessageError};
pub use principal::{Principal, Role, UnknownRole};
pub use snapshot::*;
pub use topic::{Topic, TopicError};
