//! Event-driven alert shapes.
//!
//! Each alert is derived from the entity that triggered it (a new threat
//! row, a fraud detection, a generic alert) and is broadcast to every
//! connected client.

use crate::envelope::events;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Map a 0-100 fraud risk score to a severity.
    pub fn from_risk_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Severity::Critical,
            s if s >= 70.0 => Severity::High,
            s if s >= 40.0 => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        })
    }
}

// =============================================================================
// TRIGGERING ENTITIES
// =============================================================================

/// A newly recorded threat event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub threat_type: String,
    pub severity: Severity,
    pub detected_at: DateTime<Utc>,
}

/// A newly recorded fraud detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudRecord {
    pub id: String,
    pub transaction_id: String,
    pub risk_score: f64,
    pub fraud_type: String,
    pub detected_at: DateTime<Utc>,
}

/// A newly raised system alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// ALERT PAYLOADS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub category: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&ThreatRecord> for ThreatAlert {
    fn from(threat: &ThreatRecord) -> Self {
        Self {
            id: threat.id.clone(),
            category: threat.threat_type.clone(),
            severity: threat.severity,
            message: format!(
                "{} threat detected: {}",
                threat.severity, threat.threat_type
            ),
            timestamp: threat.detected_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudAlert {
    pub id: String,
    pub transaction_id: String,
    pub risk_score: f64,
    #[serde(rename = "fraudType")]
    pub category: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&FraudRecord> for FraudAlert {
    fn from(fraud: &FraudRecord) -> Self {
        Self {
            id: fraud.id.clone(),
            transaction_id: fraud.transaction_id.clone(),
            risk_score: fraud.risk_score,
            category: fraud.fraud_type.clone(),
            severity: Severity::from_risk_score(fraud.risk_score),
            message: format!(
                "High-risk fraud detected: {} ({}% risk)",
                fraud.fraud_type, fraud.risk_score
            ),
            timestamp: fraud.detected_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub category: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&AlertRecord> for SystemAlert {
    fn from(alert: &AlertRecord) -> Self {
        Self {
            id: alert.id.clone(),
            category: alert.alert_type.clone(),
            severity: alert.severity,
            title: alert.title.clone(),
            message: alert.message.clone(),
            timestamp: alert.created_at,
        }
    }
}

/// One of the three broadcast interrupts.
#[derive(Debug, Clone, PartialEq)]
pub enum SecurityEvent {
    Threat(ThreatAlert),
    Fraud(FraudAlert),
    System(SystemAlert),
}

impl SecurityEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            SecurityEvent::Threat(_) => events::THREAT_ALERT,
            SecurityEvent::Fraud(_) => events::FRAUD_ALERT,
            SecurityEvent::System(_) => events::SYSTEM_ALERT,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            SecurityEvent::Threat(a) => a.severity,
            SecurityEvent::Fraud(a) => a.severity,
            SecurityEvent::System(a) => a.severity,
        }
    }

    pub fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            SecurityEvent::Threat(a) => serde_json::to_value(a),
            SecurityEvent::Fraud(a) => serde_json::to_value(a),
            SecurityEvent::System(a) => serde_json::to_value(a),
        }
    }
}

impl From<ThreatAlert> for SecurityEvent {
    fn from(a: ThreatAlert) -> Self {
        SecurityEvent::Threat(a)
    }
}

impl From<FraudAlert> for SecurityEvent {
    fn from(a: FraudAlert) -> Self {
        SecurityEvent::Fraud(a)
    }
}

impl From<SystemAlert> for SecurityEvent {
    fn from(a: SystemAlert) -> Self {
        SecurityEvent::System(a)
    }
}
