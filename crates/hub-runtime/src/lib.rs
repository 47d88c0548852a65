//! # Sentinel Hub Runtime
//!
//! Startup wiring for the broadcast hub binary.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`SN_CONFIG` file, then `SN_*` environment)
//! 2. Install tracing (`RUST_LOG`, else the configured level)
//! 3. Seed the user directory and build the data provider
//! 4. Start the hub service (feeds, stats logger, HTTP listener)
//! 5. Wait for Ctrl-C, then shut down gracefully

pub mod adapters;
pub mod config;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

pub use adapters::{DemoDataProvider, InMemoryUserStore};
pub use config::{RuntimeConfig, UserEntry};

/// Install the global fmt subscriber.
pub fn init_tracing(default_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
