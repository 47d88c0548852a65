//! Outbound ports: collaborators the hub depends on.

use crate::domain::error::{ProviderError, StoreError};
use async_trait::async_trait;
use shared_types::{Role, Snapshot, SnapshotKind};

/// Supplies snapshots for the periodic and one-shot pushes.
///
/// `Ok(None)` means there is nothing new to send this cycle; no frame is
/// pushed. An error skips the cycle and is logged; the feed keeps running.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn snapshot(&self, kind: SnapshotKind) -> Result<Option<Snapshot>, ProviderError>;
}

/// User directory entry needed to admit a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub role: Role,
    pub is_active: bool,
}

/// User directory lookup.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError>;
}

/// Time source trait for testability
pub trait TimeSource: Send + Sync {
    /// Seconds since the Unix epoch
    fn now(&self) -> u64;
}

/// System time implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            // Clock before Unix epoch: treat as 0 rather than panic
            .unwrap_or(0)
    }
}

/// Fixed clock for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub u64);

impl TimeSource for FixedTimeSource {
    fn now(&self) -> u64 {
        self.0
    }
}
