//! Subscription and delivery configuration

use super::errors::EventsError;
use serde::{Deserialize, Serialize};

/// Default cap on live subscriptions.
pub const DEFAULT_MAX_SUBSCRIPTIONS: usize = 10_000;

/// Configuration for the subscription registry and delivery pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Maximum live subscriptions. Only admission of a new id is capped;
    /// overwriting an existing id is always allowed.
    pub max_subscriptions: usize,
    /// Encrypt per-subscription payloads on the rayon pool.
    pub parallel_encryption: bool,
    /// Emit a `trace!` event for every (subscription, log) relevance decision.
    pub trace_disclosure_decisions: bool,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            max_subscriptions: DEFAULT_MAX_SUBSCRIPTIONS,
            parallel_encryption: true,
            trace_disclosure_decisions: false,
        }
    }
}

impl SubscriptionConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), EventsError> {
        if self.max_subscriptions == 0 {
            return Err(EventsError::InvalidConfig(
                "max_subscriptions cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder-style method to set the subscription cap
    pub fn with_max_subscriptions(mut self, max: usize) -> Self {
        self.max_subscriptions = max;
        self
    }

    /// Builder-style method to toggle parallel encryption
    pub fn with_parallel_encryption(mut self, enabled: bool) -> Self {
        self.parallel_encryption = enabled;
        self
    }

    /// Builder-style method to toggle per-decision tracing
    pub fn with_trace_disclosure_decisions(mut self, enabled: bool) -> Self {
        self.trace_disclosure_decisions = enabled;
        self
    }
}
