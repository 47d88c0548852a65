//! In-memory user directory.

use crate::config::UserEntry;
use async_trait::async_trait;
use dashmap::DashMap;
use shared_types::Role;
use sn_01_broadcast_hub::{StoreError, UserRecord, UserStore};

/// User directory seeded from configuration.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: DashMap<String, UserRecord>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[UserEntry]) -> Self {
        let store = Self::new();
        for entry in entries {
            store.insert(&entry.id, entry.role, entry.active);
        }
        store
    }

    /// Add or replace a user.
    pub fn insert(&self, id: &str, role: Role, is_active: bool) {
        self.users.insert(
            id.to_string(),
            UserRecord {
                id: id.to_string(),
                role,
                is_active,
            },
        );
    }

    /// Mark a user inactive. Existing connections are unaffected;
    /// new connection attempts are refused.
    pub fn deactivate(&self, id: &str) -> bool {
        match self.users.get_mut(id) {
            Some(mut user) => {
                user.is_active = false;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.get(id).map(|user| user.value().clone()))
    }
}
