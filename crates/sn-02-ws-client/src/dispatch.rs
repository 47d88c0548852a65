//! Listener registry: inbound envelopes fanned out by message type.
//!
//! Each registration gets its own id, so releasing one handle never
//! disturbs another registration for the same type.

use crate::error::ListenerError;
use parking_lot::Mutex;
use shared_types::Envelope;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::warn;

type Callback = Arc<dyn Fn(&Envelope) -> Result<(), ListenerError> + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    by_kind: Mutex<HashMap<String, Vec<(u64, Callback)>>>,
}

impl Listeners {
    fn remove(&self, kind: &str, id: u64) -> bool {
        let mut by_kind = self.by_kind.lock();
        let Some(entries) = by_kind.get_mut(kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            by_kind.remove(kind);
        }
        removed
    }
}

#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Listeners>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for envelopes of type `kind`.
    pub fn on<F>(&self, kind: impl Into<String>, callback: F) -> ListenerHandle
    where
        F: Fn(&Envelope) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let kind = kind.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .by_kind
            .lock()
            .entry(kind.clone())
            .or_default()
            .push((id, Arc::new(callback)));

        ListenerHandle {
            id,
            kind,
            listeners: Arc::downgrade(&self.inner),
        }
    }

    /// Call every callback registered for the envelope's type.
    ///
    /// Callbacks run outside the lock. One that errors or panics is logged
    /// and the rest still run. Returns how many callbacks were invoked.
    pub fn dispatch(&self, envelope: &Envelope) -> usize {
        let callbacks: Vec<Callback> = match self.inner.by_kind.lock().get(&envelope.kind) {
            Some(entries) => entries.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return 0,
        };

        for callback in &callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(envelope))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(kind = %envelope.kind, error = %e, "Listener returned an error");
                }
                Err(_) => {
                    warn!(kind = %envelope.kind, "Listener panicked");
                }
            }
        }
        callbacks.len()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.inner
            .by_kind
            .lock()
            .get(kind)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Capability to remove exactly one registration.
#[derive(Debug)]
pub struct ListenerHandle {
    id: u64,
    kind: String,
    listeners: Weak<Listeners>,
}

impl ListenerHandle {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Remove the registration. Returns false if it was already gone.
    pub fn release(self) -> bool {
        self.listeners
            .upgrade()
            .map(|listeners| listeners.remove(&self.kind, self.id))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").finish_non_exhaustive()
    }
}
