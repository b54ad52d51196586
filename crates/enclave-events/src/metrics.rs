//! Metrics for subscription admission and log delivery
//!
//! Counters only; nothing here identifies an account or a subscription.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector for the subscription registry and delivery pipeline
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    /// Subscriptions admitted (including overwrites)
    pub subscriptions_added: AtomicU64,
    /// Registrations rejected at admission
    pub subscriptions_rejected: AtomicU64,
    /// Subscriptions removed (absent ids not counted)
    pub subscriptions_removed: AtomicU64,
    /// Batches that went through a full delivery pass
    pub batches_delivered: AtomicU64,
    /// Batches skipped with no subscriptions or no logs
    pub idle_batches_skipped: AtomicU64,
    /// State snapshots requested
    pub state_snapshots: AtomicU64,
    /// (subscription, log) pairs disclosed
    pub logs_disclosed: AtomicU64,
    /// Ciphertexts returned to the transport
    pub ciphertexts_produced: AtomicU64,
    /// Delivery passes that failed
    pub delivery_failures: AtomicU64,
    /// Cumulative delivery pass time in nanoseconds
    pub delivery_time_ns: AtomicU64,
}

impl DeliveryMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_subscription_added(&self) {
        self.subscriptions_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subscription_rejected(&self) {
        self.subscriptions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subscription_removed(&self) {
        self.subscriptions_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_idle_batch(&self) {
        self.idle_batches_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_state_snapshot(&self) {
        self.state_snapshots.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed delivery pass
    ///
    /// # Arguments
    /// * `logs_disclosed` - Total logs across all subscriptions
    /// * `ciphertexts` - Entries in the returned map
    /// * `duration` - Time taken by the pass
    pub fn record_delivery(&self, logs_disclosed: u64, ciphertexts: u64, duration: Duration) {
        self.batches_delivered.fetch_add(1, Ordering::Relaxed);
        self.logs_disclosed.fetch_add(logs_disclosed, Ordering::Relaxed);
        self.ciphertexts_produced.fetch_add(ciphertexts, Ordering::Relaxed);
        self.delivery_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn record_delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            subscriptions_added: self.subscriptions_added.load(Ordering::Relaxed),
            subscriptions_rejected: self.subscriptions_rejected.load(Ordering::Relaxed),
            subscriptions_removed: self.subscriptions_removed.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            idle_batches_skipped: self.idle_batches_skipped.load(Ordering::Relaxed),
            state_snapshots: self.state_snapshots.load(Ordering::Relaxed),
            logs_disclosed: self.logs_disclosed.load(Ordering::Relaxed),
            ciphertexts_produced: self.ciphertexts_produced.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            avg_delivery_ns: self.avg_delivery_time_ns(),
        }
    }

    /// Calculate average delivery pass time in nanoseconds
    pub fn avg_delivery_time_ns(&self) -> u64 {
        let total = self.delivery_time_ns.load(Ordering::Relaxed);
        let count = self.batches_delivered.load(Ordering::Relaxed);
        if count > 0 {
            total / count
        } else {
            0
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub subscriptions_added: u64,
    pub subscriptions_rejected: u64,
    pub subscriptions_removed: u64,
    pub batches_delivered: u64,
    pub idle_batches_skipped: u64,
    pub state_snapshots: u64,
    pub logs_disclosed: u64,
    pub ciphertexts_produced: u64,
    pub delivery_failures: u64,
    pub avg_delivery_ns: u64,
}
