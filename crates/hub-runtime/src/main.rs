//! Broadcast hub entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use hub_runtime::{init_tracing, DemoDataProvider, InMemoryUserStore, RuntimeConfig};
use sn_01_broadcast_hub::{HubError, HubService};
use tokio::task::JoinError;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::load().context("failed to load configuration")?;
    init_tracing(&config.log_level)?;

    info!("===========================================");
    info!("  Sentinel Broadcast Hub v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    match &config.source {
        Some(path) => info!(path = %path.display(), "Loaded configuration file"),
        None => info!("No configuration file, using defaults and environment"),
    }

    let users = Arc::new(InMemoryUserStore::from_entries(&config.users));
    if users.is_empty() {
        warn!("No users configured; every connection will be refused");
    } else {
        info!(users = users.len(), "User directory seeded");
    }

    let provider = Arc::new(DemoDataProvider::new());
    let service = Arc::new(
        HubService::new(config.hub.clone(), users, provider)
            .context("failed to create hub service")?,
    );

    let mut server = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.start().await })
    };

    info!(
        addr = %config.hub.bind_addr(),
        path = %config.hub.server.ws_path,
        "Hub running. Press Ctrl+C to stop."
    );

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            info!("Shutdown signal received");
            service.shutdown();
        }
        finished = &mut server => {
            return report(finished);
        }
    }

    report(server.await)
}

fn report(finished: Result<Result<(), HubError>, JoinError>) -> Result<()> {
    match finished {
        Ok(Ok(())) => {
            info!("Hub stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "Hub terminated with error");
            Err(e).context("hub service failed")
        }
        Err(e) => Err(e).context("hub task panicked"),
    }
}
