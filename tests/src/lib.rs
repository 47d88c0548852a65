//! # Sentinel Test Suite
//!
//! Unified test crate for cross-crate scenarios.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # Tokens, users, scripted data providers
//! └── integration/
//!     ├── hub_properties.rs   # Registry, publishers and sessions together
//!     ├── client_recovery.rs  # Reconnection manager against scripted transports
//!     └── e2e_websocket.rs    # Live axum server + WebSocket clients
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sn-tests
//! cargo test -p sn-tests integration::e2e_websocket::
//! ```

#![allow(dead_code)]

pub mod fixtures;
