//! Connection state machine and retry bookkeeping.
//!
//! ```text
//! DISCONNECTED → CONNECTING → CONNECTED → (error/close) → RECONNECT_WAIT
//!                    ▲                                         │
//!                    └─────────────────────────────────────────┘
//!                         … after N consecutive failures → FAILED
//! ```

use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ReconnectWait,
    /// Terminal; no further attempts are made.
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::ReconnectWait => "RECONNECT_WAIT",
            ConnectionState::Failed => "FAILED",
        })
    }
}

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

/// What to do after a failed attempt or lost connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp { attempts: u32 },
}

/// Counts consecutive failures since the last successful connection.
#[derive(Debug, Clone)]
pub struct ReconnectTracker {
    policy: ReconnectPolicy,
    failures: u32,
}

impl ReconnectTracker {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn on_connected(&mut self) {
        self.failures = 0;
    }

    pub fn on_failure(&mut self) -> RetryDecision {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.policy.max_attempts {
            RetryDecision::GiveUp {
                attempts: self.failures,
            }
        } else {
            RetryDecision::RetryAfter(self.policy.delay)
        }
    }
}
