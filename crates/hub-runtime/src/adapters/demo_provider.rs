//! Demo data provider: plausible, randomized dashboard snapshots.
//!
//! Counters drift between calls so the dashboard visibly moves. Threats
//! appear occasionally; a threats cycle with nothing new reports `None`.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_types::{
    BiometricUpdate, BlockchainUpdate, FraudUpdate, RecentAlert, SecurityOverview, Severity,
    Snapshot, SnapshotKind, ThreatUpdate,
};
use sn_01_broadcast_hub::{DataProvider, ProviderError};
use uuid::Uuid;

/// Genesis height reported before any block is seen.
const BASE_BLOCK_HEIGHT: u64 = 2_847_293;
/// Alerts kept for the `alerts:recent` snapshot.
const RECENT_ALERT_LIMIT: usize = 10;
/// Chance that a threats cycle produces a new threat.
const THREAT_PROBABILITY: f64 = 0.3;

const THREAT_TYPES: [&str; 5] = ["MALWARE", "PHISHING", "DDOS", "BRUTE_FORCE", "DATA_EXFILTRATION"];
const LOCATIONS: [&str; 5] = ["Frankfurt", "Singapore", "São Paulo", "Virginia", "Mumbai"];

#[derive(Debug)]
struct DemoState {
    rng: StdRng,
    active_threats: u64,
    critical_alerts: u64,
    blocked_today: u64,
    protected_transactions: u64,
    block_height: u64,
    total_verified: u64,
    authenticated_users: u64,
    recent_alerts: Vec<RecentAlert>,
}

impl DemoState {
    fn new(rng: StdRng) -> Self {
        let mut state = Self {
            rng,
            active_threats: 7,
            critical_alerts: 1,
            blocked_today: 1_284,
            protected_transactions: 48_210,
            block_height: BASE_BLOCK_HEIGHT,
            total_verified: 15_732,
            authenticated_users: 3_247,
            recent_alerts: Vec::new(),
        };
        for _ in 0..3 {
            state.record_alert(Severity::Medium, "Suspicious login pattern");
        }
        state
    }

    fn record_alert(&mut self, severity: Severity, title: &str) {
        let minutes_ago = self.rng.gen_range(0..60);
        self.recent_alerts.insert(
            0,
            RecentAlert {
                id: Uuid::now_v7().to_string(),
                alert_type: "SECURITY".to_string(),
                severity,
                title: title.to_string(),
                message: format!("{title} flagged by automated monitoring"),
                timestamp: Utc::now() - ChronoDuration::minutes(minutes_ago),
                is_read: false,
                is_resolved: false,
            },
        );
        self.recent_alerts.truncate(RECENT_ALERT_LIMIT);
    }

    fn overview(&mut self) -> SecurityOverview {
        self.blocked_today += self.rng.gen_range(0..5);
        self.protected_transactions += self.rng.gen_range(10..200);
        SecurityOverview {
            security_score: SecurityOverview::score(self.active_threats, self.critical_alerts),
            active_threats: self.active_threats,
            blocked_today: self.blocked_today,
            protected_transactions: self.protected_transactions,
            timestamp: Utc::now(),
        }
    }

    fn next_threat(&mut self) -> Option<ThreatUpdate> {
        if !self.rng.gen_bool(THREAT_PROBABILITY) {
            return None;
        }
        let risk_score: f64 = self.rng.gen_range(20.0..100.0);
        let severity = Severity::from_risk_score(risk_score);
        let threat_type = THREAT_TYPES[self.rng.gen_range(0..THREAT_TYPES.len())];
        let location = LOCATIONS[self.rng.gen_range(0..LOCATIONS.len())];

        self.active_threats += 1;
        if severity == Severity::Critical {
            self.critical_alerts += 1;
            self.record_alert(severity, &format!("Critical {threat_type} activity"));
        }

        Some(ThreatUpdate {
            id: Uuid::now_v7().to_string(),
            threat_type: threat_type.to_string(),
            severity,
            location: Some(location.to_string()),
            description: format!("{threat_type} detected near {location}"),
            status: "ACTIVE".to_string(),
            source: Some(format!(
                "10.{}.{}.{}",
                self.rng.gen_range(0..=255u8),
                self.rng.gen_range(0..=255u8),
                self.rng.gen_range(1..=254u8)
            )),
            confidence: (self.rng.gen_range(0.6..0.99_f64) * 100.0).round() / 100.0,
            risk_score: risk_score.round(),
            timestamp: Utc::now(),
        })
    }

    fn fraud(&mut self) -> FraudUpdate {
        FraudUpdate {
            ai_accuracy: 98.7 + (self.rng.gen::<f64>() - 0.5) * 0.5,
            fraud_prevented: 4.2 + self.rng.gen::<f64>() * 0.1,
            risk_score: self.rng.gen_range(10..40),
            models_active: 12,
            timestamp: Utc::now(),
        }
    }

    fn blockchain(&mut self) -> BlockchainUpdate {
        self.block_height += self.rng.gen_range(1..4);
        self.total_verified += self.rng.gen_range(0..25);
        BlockchainUpdate {
            total_verified: self.total_verified,
            block_height: self.block_height,
            timestamp: Utc::now(),
        }
    }

    fn biometric(&mut self) -> BiometricUpdate {
        self.authenticated_users += self.rng.gen_range(0..12);
        BiometricUpdate {
            authenticated_users: self.authenticated_users,
            success_rate: 99.2 + (self.rng.gen::<f64>() - 0.5) * 2.0,
            timestamp: Utc::now(),
        }
    }
}

/// Randomized stand-in for the analytics database.
#[derive(Debug)]
pub struct DemoDataProvider {
    state: Mutex<DemoState>,
}

impl DemoDataProvider {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible sequence for tests.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: Mutex::new(DemoState::new(rng)),
        }
    }

    fn produce(&self, kind: SnapshotKind) -> Result<Option<Snapshot>, serde_json::Error> {
        let mut state = self.state.lock();
        let snapshot = match kind {
            SnapshotKind::Overview => Snapshot::from_serialize(&state.overview())?,
            SnapshotKind::RecentAlerts => Snapshot::from_serialize(&state.recent_alerts)?,
            SnapshotKind::Threats => match state.next_threat() {
                Some(threat) => Snapshot::from_serialize(&[threat])?,
                None => return Ok(None),
            },
            SnapshotKind::Fraud => Snapshot::from_serialize(&state.fraud())?,
            SnapshotKind::Blockchain => Snapshot::from_serialize(&state.blockchain())?,
            SnapshotKind::Biometric => Snapshot::from_serialize(&state.biometric())?,
        };
        Ok(Some(snapshot))
    }
}

impl Default for DemoDataProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataProvider for DemoDataProvider {
    async fn snapshot(&self, kind: SnapshotKind) -> Result<Option<Snapshot>, ProviderError> {
        self.produce(kind)
            .map_err(|e| ProviderError::unavailable(kind, e.to_string()))
    }
}
