//! Periodic feeds.
//!
//! One task and one interval timer per feed. A provider failure skips the
//! current cycle only; the timer keeps running.

use super::delivery::{self, DeliveryReport};
use crate::domain::config::FeedConfig;
use crate::ports::DataProvider;
use crate::registry::TopicRegistry;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// What happened on one tick of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nobody to send to; the provider was not called.
    NoAudience,
    /// Provider had nothing new.
    Empty,
    /// Provider or encoding failed; cycle skipped.
    Skipped,
    Published(DeliveryReport),
}

pub struct PeriodicPublisher {
    registry: Arc<TopicRegistry>,
    provider: Arc<dyn DataProvider>,
}

impl PeriodicPublisher {
    pub fn new(registry: Arc<TopicRegistry>, provider: Arc<dyn DataProvider>) -> Self {
        Self { registry, provider }
    }

    /// Run a single cycle of `feed`.
    pub async fn publish_cycle(&self, feed: &FeedConfig) -> CycleOutcome {
        if delivery::recipients(&self.registry, &feed.audience).is_empty() {
            return CycleOutcome::NoAudience;
        }

        let snapshot = match self.provider.snapshot(feed.kind).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return CycleOutcome::Empty,
            Err(e) => {
                warn!(feed = %feed.event, error = %e, "Snapshot failed, skipping cycle");
                return CycleOutcome::Skipped;
            }
        };

        let frame = match delivery::frame(&feed.event, snapshot.into_payload()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(feed = %feed.event, error = %e, "Failed to encode snapshot");
                return CycleOutcome::Skipped;
            }
        };

        // Resolved again: membership may have changed during the provider call
        let recipients = delivery::recipients(&self.registry, &feed.audience);
        let report = delivery::deliver(&self.registry, &recipients, &frame);
        debug!(
            feed = %feed.event,
            audience = %feed.audience,
            delivered = report.delivered,
            "Published snapshot"
        );
        CycleOutcome::Published(report)
    }

    /// Spawn one task per feed. Each stops when `shutdown` flips to true.
    pub fn spawn_feeds(
        self: &Arc<Self>,
        feeds: &[FeedConfig],
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        feeds
            .iter()
            .cloned()
            .map(|feed| tokio::spawn(feed_task(Arc::clone(self), feed, shutdown.clone())))
            .collect()
    }
}

/// Drive one feed until shutdown. The first tick fires one interval after
/// start.
pub async fn feed_task(
    publisher: Arc<PeriodicPublisher>,
    feed: FeedConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + feed.interval, feed.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(feed = %feed.event, interval = ?feed.interval, "Feed started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                publisher.publish_cycle(&feed).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(feed = %feed.event, "Feed stopped");
}
