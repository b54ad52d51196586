//! # Subscription Registry
//!
//! Owns the live subscriptions. Admission runs the full
//! decrypt → decode → authorize chain before anything is stored, so a failed
//! registration never leaves partial state.
//!
//! ## Locking
//!
//! Subscriptions are stored behind `Arc` in a `parking_lot::RwLock`ed map.
//! Writers hold the lock only for the map insert or remove. A delivery pass
//! copies the map's `(id, Arc)` pairs under a short read lock and iterates
//! the copy, so it sees the map exactly as it was when the pass began and
//! never blocks admission while it filters or encrypts.

use crate::domain::config::SubscriptionConfig;
use crate::domain::entities::{LogSubscription, SubscriptionId, SubscriptionRequest};
use crate::domain::errors::EventsError;
use crate::domain::viewing_key::ViewingKeyAuthorizer;
use crate::metrics::DeliveryMetrics;
use crate::ports::outbound::{InboundDecryptor, SubscriptionDecoder};
use parking_lot::RwLock;
use shared_types::to_hex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A subscription as seen by one delivery pass.
pub type SubscriptionSnapshot = Vec<(SubscriptionId, Arc<LogSubscription>)>;

/// Live, authenticated log subscriptions keyed by transport id.
pub struct SubscriptionRegistry {
    subscriptions: RwLock<HashMap<SubscriptionId, Arc<LogSubscription>>>,
    decryptor: Arc<dyn InboundDecryptor>,
    decoder: Arc<dyn SubscriptionDecoder>,
    authorizer: ViewingKeyAuthorizer,
    max_subscriptions: usize,
    metrics: Arc<DeliveryMetrics>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new(
        config: &SubscriptionConfig,
        decryptor: Arc<dyn InboundDecryptor>,
        decoder: Arc<dyn SubscriptionDecoder>,
        metrics: Arc<DeliveryMetrics>,
    ) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            decryptor,
            decoder,
            authorizer: ViewingKeyAuthorizer::default(),
            max_subscriptions: config.max_subscriptions,
            metrics,
        }
    }

    /// Builder-style method to replace the viewing-key authorizer
    pub fn with_authorizer(mut self, authorizer: ViewingKeyAuthorizer) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Admit a subscription from an encrypted registration payload.
    ///
    /// An existing subscription under `id` is replaced.
    ///
    /// # Errors
    /// * `DecryptionFailure` / `DecodeFailure` - unusable payload
    /// * `InvalidSignature` / `InvalidKey` - viewing-key authorization failed
    /// * `RegistryFull` - `id` is new and the registry is at capacity
    pub fn add(&self, id: SubscriptionId, encrypted_payload: &[u8]) -> Result<(), EventsError> {
        let result = self
            .admit(encrypted_payload)
            .and_then(|subscription| self.insert(id.clone(), subscription));

        match result {
            Ok(replaced) => {
                self.metrics.record_subscription_added();
                debug!(subscription_id = %id, replaced, "Added log subscription");
                Ok(())
            }
            Err(e) => {
                self.metrics.record_subscription_rejected();
                warn!(subscription_id = %id, error = %e, "Rejected log subscription");
                Err(e)
            }
        }
    }

    fn admit(&self, encrypted_payload: &[u8]) -> Result<LogSubscription, EventsError> {
        let plaintext = self.decryptor.decrypt(encrypted_payload)?;
        let SubscriptionRequest {
            account,
            signature,
            public_viewing_key,
            filter,
        } = self.decoder.decode(&plaintext)?;

        let handle = self
            .authorizer
            .authorize(&account, &public_viewing_key, &signature)?;

        debug!(account = %to_hex(&account), "Authorized viewing key");

        Ok(LogSubscription {
            account,
            filter,
            encryptor: Box::new(handle),
        })
    }

    /// Store a subscription, enforcing capacity for new ids.
    ///
    /// Returns whether an existing subscription was replaced.
    pub(crate) fn insert(
        &self,
        id: SubscriptionId,
        subscription: LogSubscription,
    ) -> Result<bool, EventsError> {
        let mut subscriptions = self.subscriptions.write();

        if !subscriptions.contains_key(&id) && subscriptions.len() >= self.max_subscriptions {
            return Err(EventsError::RegistryFull {
                max: self.max_subscriptions,
            });
        }

        Ok(subscriptions.insert(id, Arc::new(subscription)).is_some())
    }

    /// Remove the subscription under `id`. Returns whether one was present.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.subscriptions.write().remove(id).is_some();

        if removed {
            self.metrics.record_subscription_removed();
            debug!(subscription_id = %id, "Removed log subscription");
        }
        removed
    }

    /// Copy of every live `(id, subscription)` pair.
    pub fn snapshot(&self) -> SubscriptionSnapshot {
        self.subscriptions
            .read()
            .iter()
            .map(|(id, subscription)| (id.clone(), Arc::clone(subscription)))
            .collect()
    }

    /// Whether `id` still maps to exactly `subscription`.
    ///
    /// False once the id has been removed or overwritten.
    pub fn is_current(&self, id: &str, subscription: &Arc<LogSubscription>) -> bool {
        self.subscriptions
            .read()
            .get(id)
            .is_some_and(|live| Arc::ptr_eq(live, subscription))
    }

    /// Live subscription under `id`, if any.
    pub fn get(&self, id: &str) -> Option<Arc<LogSubscription>> {
        self.subscriptions.read().get(id).cloned()
    }

    /// Whether a subscription is stored under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.subscriptions.read().contains_key(id)
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Whether no subscriptions are stored.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }

    /// Counters shared with the delivery service.
    pub fn metrics(&self) -> &Arc<DeliveryMetrics> {
        &self.metrics
    }
}
