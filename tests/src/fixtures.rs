//! Shared fixtures: signed tokens, a seeded user directory and data
//! providers with predictable output.

use async_trait::async_trait;
use hub_runtime::InMemoryUserStore;
use parking_lot::Mutex;
use shared_types::{Envelope, Role, Snapshot, SnapshotKind};
use sn_01_broadcast_hub::{
    Claims, DataProvider, Frame, HubConfig, ProviderError, SystemTimeSource, TimeSource,
    TokenSigner,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const SECRET: &str = "integration-secret";

/// u1 ANALYST, u2 ADMIN, u3 VIEWER, and an inactive `retired` account.
pub fn users() -> Arc<InMemoryUserStore> {
    let store = InMemoryUserStore::new();
    store.insert("u1", Role::Analyst, true);
    store.insert("u2", Role::Admin, true);
    store.insert("u3", Role::Viewer, true);
    store.insert("retired", Role::Analyst, false);
    Arc::new(store)
}

/// A token for `user_id` valid for one hour.
pub fn token(user_id: &str) -> String {
    token_with(SECRET, user_id, Duration::from_secs(3600))
}

pub fn token_with(secret: &str, user_id: &str, ttl: Duration) -> String {
    let now = SystemTimeSource.now();
    TokenSigner::new(secret)
        .issue(&Claims::new(user_id, now, ttl))
        .unwrap()
}

/// Token that expired an hour ago.
pub fn expired_token(user_id: &str) -> String {
    let issued = SystemTimeSource.now() - 7200;
    TokenSigner::new(SECRET)
        .issue(&Claims::new(user_id, issued, Duration::from_secs(3600)))
        .unwrap()
}

/// Hub config bound to an ephemeral localhost port.
pub fn hub_config() -> HubConfig {
    let mut config = HubConfig::default();
    config.auth.jwt_secret = SECRET.to_string();
    config.server.host = "127.0.0.1".parse().unwrap();
    config.server.port = 0;
    config
}

/// Every snapshot is `{"kind": ..., "cycle": n}` where `n` counts calls
/// per kind. Cycles listed in `fail_on` for a kind return an error.
#[derive(Default)]
pub struct CountingProvider {
    calls: Mutex<Vec<(SnapshotKind, usize)>>,
    failures: HashSet<(SnapshotKind, usize)>,
    total: AtomicUsize,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(kind: SnapshotKind, cycles: &[usize]) -> Self {
        Self {
            failures: cycles.iter().map(|c| (kind, *c)).collect(),
            ..Self::default()
        }
    }

    /// Calls made so far for `kind`.
    pub fn calls(&self, kind: SnapshotKind) -> usize {
        self.calls
            .lock()
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    fn next_cycle(&self, kind: SnapshotKind) -> usize {
        self.total.fetch_add(1, Ordering::SeqCst);
        let mut calls = self.calls.lock();
        match calls.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, n)) => {
                *n += 1;
                *n
            }
            None => {
                calls.push((kind, 1));
                1
            }
        }
    }
}

#[async_trait]
impl DataProvider for CountingProvider {
    async fn snapshot(&self, kind: SnapshotKind) -> Result<Option<Snapshot>, ProviderError> {
        let cycle = self.next_cycle(kind);
        if self.failures.contains(&(kind, cycle)) {
            return Err(ProviderError::unavailable(kind, "scripted failure"));
        }
        Ok(Some(Snapshot::new(serde_json::json!({
            "kind": kind.to_string(),
            "cycle": cycle,
        }))))
    }
}

/// Parse a queued frame.
pub fn decode(frame: &Frame) -> Envelope {
    Envelope::parse(frame).unwrap()
}

/// Everything currently queued for a connection, decoded.
pub fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<Envelope> {
    let mut out = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        out.push(decode(&frame));
    }
    out
}

/// Message types of everything currently queued.
pub fn drain_kinds(rx: &mut mpsc::Receiver<Frame>) -> Vec<String> {
    drain(rx).into_iter().map(|e| e.kind).collect()
}
