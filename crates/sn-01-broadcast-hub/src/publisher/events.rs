//! Event-driven pushes.
//!
//! Alerts raised elsewhere in the system are interrupts: they go to every
//! authenticated connection, regardless of topic membership. Publishing is
//! fire-and-forget; it never blocks and never fails the caller.

use super::delivery;
use crate::domain::config::Audience;
use crate::registry::TopicRegistry;
use serde_json::Value;
use shared_types::{
    AlertRecord, FraudAlert, FraudRecord, SecurityEvent, SystemAlert, ThreatAlert, ThreatRecord,
    Topic,
};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct EventPublisher {
    registry: Arc<TopicRegistry>,
}

impl EventPublisher {
    pub fn new(registry: Arc<TopicRegistry>) -> Self {
        Self { registry }
    }

    /// Queue `event` for the audience. Returns how many connections it was
    /// queued to; zero when nobody is connected.
    pub fn publish(&self, audience: &Audience, event: &SecurityEvent) -> usize {
        let payload = match event.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(event = event.event_name(), error = %e, "Failed to encode event");
                return 0;
            }
        };
        self.push(audience, event.event_name(), payload)
    }

    /// `threat:alert` to every connection.
    pub fn publish_threat(&self, threat: &ThreatRecord) -> usize {
        self.publish(&Audience::All, &SecurityEvent::Threat(ThreatAlert::from(threat)))
    }

    /// `fraud:alert` to every connection.
    pub fn publish_fraud(&self, fraud: &FraudRecord) -> usize {
        self.publish(&Audience::All, &SecurityEvent::Fraud(FraudAlert::from(fraud)))
    }

    /// `system:alert` to every connection.
    pub fn publish_system(&self, alert: &AlertRecord) -> usize {
        self.publish(&Audience::All, &SecurityEvent::System(SystemAlert::from(alert)))
    }

    /// Arbitrary named push to one topic's members, e.g. `user:<id>`.
    pub fn publish_to(&self, topic: &Topic, event: &str, payload: Value) -> usize {
        self.push(&Audience::Topic(topic.clone()), event, payload)
    }

    fn push(&self, audience: &Audience, event: &str, payload: Value) -> usize {
        let recipients = delivery::recipients(&self.registry, audience);
        if recipients.is_empty() {
            return 0;
        }

        let frame = match delivery::frame(event, payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(event, error = %e, "Failed to encode event");
                return 0;
            }
        };

        let report = delivery::deliver(&self.registry, &recipients, &frame);
        debug!(event, audience = %audience, delivered = report.delivered, "Event published");
        report.delivered
    }
}
