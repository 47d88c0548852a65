//! Topic registry: topic → connections and connection → topics.
//!
//! Both maps live behind one lock so every mutation and every member
//! snapshot is a single atomic step. Publishers iterate the snapshot they
//! were handed, never the live maps, so a join/leave/close racing with a
//! publish cannot disturb it.

use crate::domain::connection::{ConnectionHandle, ConnectionId};
use crate::domain::error::RegistryError;
use parking_lot::RwLock;
use shared_types::Topic;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

struct Member {
    handle: ConnectionHandle,
    topics: HashSet<Topic>,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<ConnectionId, Member>,
    topics: HashMap<Topic, HashSet<ConnectionId>>,
}

impl Inner {
    fn detach(&mut self, id: &ConnectionId, topic: &Topic) {
        if let Some(members) = self.topics.get_mut(topic) {
            members.remove(id);
            if members.is_empty() {
                self.topics.remove(topic);
            }
        }
    }
}

#[derive(Default)]
pub struct TopicRegistry {
    inner: RwLock<Inner>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an authenticated connection. Returns false if already known.
    pub fn register(&self, handle: ConnectionHandle) -> bool {
        let id = handle.id();
        let mut inner = self.inner.write();
        if inner.connections.contains_key(&id) {
            return false;
        }
        inner.connections.insert(
            id,
            Member {
                handle,
                topics: HashSet::new(),
            },
        );
        debug!(connection_id = %id, "Registered connection");
        true
    }

    /// Add a connection to a topic. Joining twice is a no-op; returns
    /// whether membership changed.
    pub fn join(&self, id: ConnectionId, topic: Topic) -> Result<bool, RegistryError> {
        let mut inner = self.inner.write();
        let member = inner
            .connections
            .get_mut(&id)
            .ok_or(RegistryError::UnknownConnection(id))?;

        if !member.topics.insert(topic.clone()) {
            return Ok(false);
        }
        debug!(connection_id = %id, topic = %topic, "Joined topic");
        inner.topics.entry(topic).or_default().insert(id);
        Ok(true)
    }

    /// Remove a connection from one topic. Returns whether it was a member.
    pub fn leave(&self, id: ConnectionId, topic: &Topic) -> bool {
        let mut inner = self.inner.write();
        let removed = inner
            .connections
            .get_mut(&id)
            .map(|m| m.topics.remove(topic))
            .unwrap_or(false);

        if removed {
            inner.detach(&id, topic);
            debug!(connection_id = %id, topic = %topic, "Left topic");
        }
        removed
    }

    /// Forget a connection and clear its membership everywhere.
    ///
    /// Safe for connections that were never registered or were already
    /// removed. Returns the topics it was in.
    pub fn closed(&self, id: ConnectionId) -> Vec<Topic> {
        let mut inner = self.inner.write();
        let Some(member) = inner.connections.remove(&id) else {
            return Vec::new();
        };

        for topic in &member.topics {
            inner.detach(&id, topic);
        }
        debug!(
            connection_id = %id,
            topics = member.topics.len(),
            "Removed connection from all topics"
        );
        member.topics.into_iter().collect()
    }

    /// Snapshot of a topic's current members.
    pub fn members_of(&self, topic: &Topic) -> Vec<ConnectionHandle> {
        let inner = self.inner.read();
        inner
            .topics
            .get(topic)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.connections.get(id).map(|m| m.handle.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Snapshot of every registered connection.
    pub fn all_connections(&self) -> Vec<ConnectionHandle> {
        self.inner
            .read()
            .connections
            .values()
            .map(|m| m.handle.clone())
            .collect()
    }

    pub fn get(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.inner
            .read()
            .connections
            .get(&id)
            .map(|m| m.handle.clone())
    }

    /// Connections authenticated as the given principal id.
    pub fn connections_for_principal(&self, principal_id: &str) -> Vec<ConnectionHandle> {
        self.inner
            .read()
            .connections
            .values()
            .filter(|m| m.handle.principal().id == principal_id)
            .map(|m| m.handle.clone())
            .collect()
    }

    pub fn topics_of(&self, id: ConnectionId) -> Vec<Topic> {
        self.inner
            .read()
            .connections
            .get(&id)
            .map(|m| m.topics.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, id: ConnectionId, topic: &Topic) -> bool {
        self.inner
            .read()
            .topics
            .get(topic)
            .map(|ids| ids.contains(&id))
            .unwrap_or(false)
    }

    pub fn member_count(&self, topic: &Topic) -> usize {
        self.inner
            .read()
            .topics
            .get(topic)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.read().connections.len()
    }

    pub fn topic_count(&self) -> usize {
        self.inner.read().topics.len()
    }

    /// Member count per topic, sorted by topic name.
    pub fn topic_stats(&self) -> BTreeMap<String, usize> {
        self.inner
            .read()
            .topics
            .iter()
            .map(|(topic, ids)| (topic.to_string(), ids.len()))
            .collect()
    }
}
