//! Point-in-time payloads produced by the data provider.

use crate::alerts::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What a snapshot describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    /// Security score and headline counters.
    Overview,
    /// Alert backlog from the last hour.
    RecentAlerts,
    /// Threat events detected since the previous cycle.
    Threats,
    Fraud,
    Blockchain,
    Biometric,
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SnapshotKind::Overview => "overview",
            SnapshotKind::RecentAlerts => "recent_alerts",
            SnapshotKind::Threats => "threats",
            SnapshotKind::Fraud => "fraud",
            SnapshotKind::Blockchain => "blockchain",
            SnapshotKind::Biometric => "biometric",
        })
    }
}

/// Immutable JSON payload pushed verbatim to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot(Value);

impl Snapshot {
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self)
    }

    pub fn payload(&self) -> &Value {
        &self.0
    }

    pub fn into_payload(self) -> Value {
        self.0
    }
}

// =============================================================================
// SNAPSHOT SHAPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityOverview {
    pub security_score: f64,
    pub active_threats: u64,
    pub blocked_today: u64,
    pub protected_transactions: u64,
    pub timestamp: DateTime<Utc>,
}

impl SecurityOverview {
    /// Score degrades with open threats and unresolved critical alerts,
    /// floored at 85.
    pub fn score(active_threats: u64, critical_alerts: u64) -> f64 {
        let raw = 95.0 - active_threats as f64 * 0.5 - critical_alerts as f64;
        (raw.max(85.0) * 10.0).round() / 10.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub is_resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatUpdate {
    pub id: String,
    #[serde(rename = "type")]
    pub threat_type: String,
    pub severity: Severity,
    pub location: Option<String>,
    pub description: String,
    pub status: String,
    pub source: Option<String>,
    pub confidence: f64,
    pub risk_score: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudUpdate {
    pub ai_accuracy: f64,
    pub fraud_prevented: f64,
    pub risk_score: u32,
    pub models_active: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainUpdate {
    pub total_verified: u64,
    pub block_height: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricUpdate {
    pub authenticated_users: u64,
    pub success_rate: f64,
    pub timestamp: DateTime<Utc>,
}
