//! # Subscription Delivery Service
//!
//! Application service that implements the `SubscriptionApi` trait.
//!
//! ## Delivery Pass
//!
//! One call to [`deliver_for_batch`](SubscriptionApi::deliver_for_batch) per
//! produced batch:
//!
//! 1. Return an empty map when there are no subscriptions or no logs,
//!    without touching state
//! 2. Take one state snapshot at the batch and one copy of the registry
//! 3. Flatten the receipts' logs in receipt order, then log order
//! 4. Per subscription: filter, then keep the logs it is allowed to see.
//!    Subject addresses are computed once per log per pass.
//! 5. Serialize each non-empty result to JSON and encrypt it with the
//!    subscription's viewing key, in parallel when configured
//! 6. Drop results for ids removed or overwritten while the pass ran
//!
//! ## Failure Policy
//!
//! All or nothing per batch. If any subscription's payload cannot be
//! serialized or encrypted, every ciphertext computed for the batch is
//! discarded and `DeliveryFailed` names the subscription, account and batch.
//! A missing state snapshot aborts the pass with `StateLookupFailure`.

use crate::domain::config::SubscriptionConfig;
use crate::domain::entities::{EncryptedSubscriptionLogs, LogSubscription, SubscriptionId};
use crate::domain::errors::EventsError;
use crate::domain::filter::filter_logs;
use crate::domain::relevance::{extract_subject_addresses, is_relevant, SubjectAddresses};
use crate::metrics::DeliveryMetrics;
use crate::ports::inbound::SubscriptionApi;
use crate::ports::outbound::{
    AccountStateReader, InboundDecryptor, StateProvider, SubscriptionDecoder,
};
use crate::registry::SubscriptionRegistry;
use rayon::prelude::*;
use shared_types::{to_hex, Address, Hash, Log, LogKey, Receipt};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Subject addresses memoized for one delivery pass.
///
/// Keys shared by more than one log in the batch are never memoized; those
/// logs have their subjects recomputed every time.
struct SubjectCache {
    subjects: HashMap<LogKey, SubjectAddresses>,
    colliding: HashSet<LogKey>,
}

impl SubjectCache {
    fn for_logs(logs: &[&Log]) -> Self {
        let mut seen = HashSet::with_capacity(logs.len());
        let colliding = logs
            .iter()
            .map(|log| log.key())
            .filter(|key| !seen.insert(*key))
            .collect();

        Self {
            subjects: HashMap::with_capacity(logs.len()),
            colliding,
        }
    }

    fn subjects_of(
        &mut self,
        log: &Log,
        state: &dyn AccountStateReader,
    ) -> Cow<'_, SubjectAddresses> {
        let key = log.key();
        if self.colliding.contains(&key) {
            return Cow::Owned(extract_subject_addresses(log, state));
        }
        Cow::Borrowed(
            self.subjects
                .entry(key)
                .or_insert_with(|| extract_subject_addresses(log, state)),
        )
    }

    fn len(&self) -> usize {
        self.subjects.len()
    }
}

/// Logs selected for one subscription, waiting to be encrypted.
struct PendingDelivery<'a> {
    id: SubscriptionId,
    subscription: Arc<LogSubscription>,
    logs: Vec<&'a Log>,
}

/// Confidential log subscription service.
///
/// Owns the subscription registry and reads account state through `S`.
pub struct SubscriptionManager<S: StateProvider> {
    config: SubscriptionConfig,
    registry: SubscriptionRegistry,
    state: S,
    metrics: Arc<DeliveryMetrics>,
}

impl<S: StateProvider> SubscriptionManager<S> {
    /// Create a new subscription manager.
    ///
    /// # Arguments
    /// * `config` - Validated before use
    /// * `decryptor` - Decrypts inbound registration payloads
    /// * `decoder` - Decodes decrypted registrations
    /// * `state` - Account state snapshots per block
    pub fn new(
        config: SubscriptionConfig,
        decryptor: Arc<dyn InboundDecryptor>,
        decoder: Arc<dyn SubscriptionDecoder>,
        state: S,
    ) -> Result<Self, EventsError> {
        config.validate()?;

        let metrics = Arc::new(DeliveryMetrics::new());
        let registry = SubscriptionRegistry::new(&config, decryptor, decoder, Arc::clone(&metrics));

        Ok(Self {
            config,
            registry,
            state,
            metrics,
        })
    }

    pub fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn state_provider(&self) -> &S {
        &self.state
    }

    pub fn metrics(&self) -> &DeliveryMetrics {
        &self.metrics
    }

    fn snapshot_state(
        &self,
        block_hash: &Hash,
    ) -> Result<Arc<dyn AccountStateReader>, EventsError> {
        let state = self.state.state_at(block_hash);
        self.metrics.record_state_snapshot();
        state
    }

    /// Logs from `logs` that pass the subscription's filter and that its
    /// account may see, in input order.
    fn select_logs<'a>(
        &self,
        id: &str,
        subscription: &LogSubscription,
        logs: &[&'a Log],
        state: &dyn AccountStateReader,
        cache: &mut SubjectCache,
    ) -> Vec<&'a Log> {
        filter_logs(logs.iter().copied(), &subscription.filter)
            .into_iter()
            .filter(|log| {
                let subjects = cache.subjects_of(log, state);
                let relevant = is_relevant(&subjects, &subscription.account);

                if self.config.trace_disclosure_decisions {
                    trace!(
                        subscription_id = %id,
                        block = log.block_number,
                        log_index = log.log_index,
                        subjects = subjects.len(),
                        relevant,
                        "Disclosure decision"
                    );
                }
                relevant
            })
            .collect()
    }

    fn encrypt_pending(
        &self,
        batch_hash: &Hash,
        pending: &PendingDelivery<'_>,
    ) -> Result<Vec<u8>, EventsError> {
        serde_json::to_vec(&pending.logs)
            .map_err(|e| EventsError::SerializationFailure(e.to_string()))
            .and_then(|plaintext| pending.subscription.encryptor.encrypt(&plaintext))
            .map_err(|source| EventsError::DeliveryFailed {
                subscription_id: pending.id.clone(),
                account: pending.subscription.account,
                batch_hash: *batch_hash,
                source: Box::new(source),
            })
    }

    fn encrypt_all(
        &self,
        batch_hash: &Hash,
        pending: &[PendingDelivery<'_>],
    ) -> Result<Vec<Vec<u8>>, EventsError> {
        if self.config.parallel_encryption {
            pending
                .par_iter()
                .map(|p| self.encrypt_pending(batch_hash, p))
                .collect()
        } else {
            pending
                .iter()
                .map(|p| self.encrypt_pending(batch_hash, p))
                .collect()
        }
    }

    fn deliver(
        &self,
        batch_hash: &Hash,
        receipts: &[Receipt],
    ) -> Result<EncryptedSubscriptionLogs, EventsError> {
        let started = Instant::now();
        let logs: Vec<&Log> = receipts.iter().flat_map(|r| r.logs.iter()).collect();

        if logs.is_empty() || self.registry.is_empty() {
            self.metrics.record_idle_batch();
            trace!(batch = %to_hex(batch_hash), logs = logs.len(), "Nothing to deliver");
            return Ok(EncryptedSubscriptionLogs::new());
        }

        let subscriptions = self.registry.snapshot();
        if subscriptions.is_empty() {
            self.metrics.record_idle_batch();
            return Ok(EncryptedSubscriptionLogs::new());
        }

        let state = self.snapshot_state(batch_hash)?;
        let mut cache = SubjectCache::for_logs(&logs);
        if !cache.colliding.is_empty() {
            warn!(
                batch = %to_hex(batch_hash),
                colliding_keys = cache.colliding.len(),
                "Batch repeats log keys, subjects recomputed for those logs"
            );
        }

        let pending: Vec<PendingDelivery<'_>> = subscriptions
            .into_iter()
            .filter_map(|(id, subscription)| {
                let selected =
                    self.select_logs(&id, &subscription, &logs, state.as_ref(), &mut cache);
                (!selected.is_empty()).then_some(PendingDelivery {
                    id,
                    subscription,
                    logs: selected,
                })
            })
            .collect();

        let ciphertexts = self.encrypt_all(batch_hash, &pending)?;

        let mut delivery = EncryptedSubscriptionLogs::with_capacity(pending.len());
        let mut disclosed = 0u64;
        for (p, ciphertext) in pending.iter().zip(ciphertexts) {
            if !self.registry.is_current(&p.id, &p.subscription) {
                debug!(
                    subscription_id = %p.id,
                    "Dropping delivery for replaced or removed subscription"
                );
                continue;
            }
            disclosed += p.logs.len() as u64;
            delivery.insert(p.id.clone(), ciphertext);
        }

        self.metrics
            .record_delivery(disclosed, delivery.len() as u64, started.elapsed());
        debug!(
            batch = %to_hex(batch_hash),
            logs = logs.len(),
            subjects_computed = cache.len(),
            subscriptions = delivery.len(),
            "Delivered subscribed logs"
        );

        Ok(delivery)
    }
}

impl<S: StateProvider> SubscriptionApi for SubscriptionManager<S> {
    fn add_subscription(
        &self,
        id: SubscriptionId,
        encrypted_payload: &[u8],
    ) -> Result<(), EventsError> {
        self.registry.add(id, encrypted_payload)
    }

    fn remove_subscription(&self, id: &str) {
        self.registry.remove(id);
    }

    fn deliver_for_batch(
        &self,
        batch_hash: &Hash,
        receipts: &[Receipt],
    ) -> Result<EncryptedSubscriptionLogs, EventsError> {
        self.deliver(batch_hash, receipts).map_err(|e| {
            self.metrics.record_delivery_failure();
            warn!(batch = %to_hex(batch_hash), error = %e, "Log delivery failed, batch discarded");
            e
        })
    }

    fn filter_logs_for_receipt(
        &self,
        receipt: &Receipt,
        account: &Address,
    ) -> Result<Vec<Log>, EventsError> {
        if receipt.logs.is_empty() {
            return Ok(Vec::new());
        }

        let state = self.snapshot_state(&receipt.block_hash)?;

        Ok(receipt
            .logs
            .iter()
            .filter(|log| is_relevant(&extract_subject_addresses(log, state.as_ref()), account))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        BincodeSubscriptionCodec, EnclaveKeyDecryptor, InMemoryAccountState, InMemoryStateProvider,
    };
    use crate::domain::entities::FilterCriteria;
    use crate::domain::relevance::ADDRESS_PADDING_LEN;
    use crate::domain::viewing_key::LogEncryptor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BATCH: Hash = [0xB0; 32];
    const USER: Address = [0x11; 20];

    struct FailingEncryptor;

    impl LogEncryptor for FailingEncryptor {
        fn encrypt(&self, _plaintext: &[u8]) -> Result<Vec<u8>, EventsError> {
            Err(EventsError::EncryptionFailure("hardware key unavailable".into()))
        }
    }

    /// Returns the plaintext as-is and counts calls.
    #[derive(Default)]
    struct PlainEncryptor {
        calls: Arc<AtomicUsize>,
    }

    impl LogEncryptor for PlainEncryptor {
        fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EventsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(plaintext.to_vec())
        }
    }

    struct HookEncryptor {
        on_encrypt: Box<dyn Fn() + Send + Sync>,
    }

    impl LogEncryptor for HookEncryptor {
        fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EventsError> {
            (self.on_encrypt)();
            Ok(plaintext.to_vec())
        }
    }

    fn manager(config: SubscriptionConfig) -> SubscriptionManager<InMemoryStateProvider> {
        let state = InMemoryStateProvider::new()
            .with_state(BATCH, InMemoryAccountState::new().with_account(USER, 1, None));
        SubscriptionManager::new(
            config,
            Arc::new(EnclaveKeyDecryptor::generate()),
            Arc::new(BincodeSubscriptionCodec),
            state,
        )
        .unwrap()
    }

    fn subscribe(
        manager: &SubscriptionManager<InMemoryStateProvider>,
        id: &str,
        account: Address,
        encryptor: Box<dyn LogEncryptor>,
    ) {
        manager
            .registry()
            .insert(
                id.to_string(),
                LogSubscription {
                    account,
                    filter: FilterCriteria::any(),
                    encryptor,
                },
            )
            .unwrap();
    }

    fn padded(address: &Address) -> Hash {
        let mut topic = [0u8; 32];
        topic[ADDRESS_PADDING_LEN..].copy_from_slice(address);
        topic
    }

    fn log(log_index: u32, topics: Vec<Hash>) -> Log {
        Log {
            address: [0xC1; 20],
            topics,
            data: vec![log_index as u8],
            block_number: 9,
            transaction_hash: [0x7A; 32],
            transaction_index: 0,
            block_hash: BATCH,
            log_index,
            removed: false,
        }
    }

    fn receipt(logs: Vec<Log>) -> Receipt {
        Receipt {
            transaction_hash: [0x7A; 32],
            block_hash: BATCH,
            block_number: 9,
            status: 1,
            logs,
        }
    }

    fn delivered_logs(delivery: &EncryptedSubscriptionLogs, id: &str) -> Vec<Log> {
        serde_json::from_slice(&delivery[id]).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = SubscriptionManager::new(
            SubscriptionConfig::default().with_max_subscriptions(0),
            Arc::new(EnclaveKeyDecryptor::generate()),
            Arc::new(BincodeSubscriptionCodec),
            InMemoryStateProvider::new(),
        );
        assert!(matches!(result, Err(EventsError::InvalidConfig(_))));
    }

    #[test]
    fn test_no_subscriptions_skips_state() {
        let manager = manager(SubscriptionConfig::default());

        let delivery = manager
            .deliver_for_batch(&BATCH, &[receipt(vec![log(0, vec![])])])
            .unwrap();

        assert!(delivery.is_empty());
        assert_eq!(manager.state_provider().snapshot_requests(), 0);
        assert_eq!(manager.metrics().snapshot().idle_batches_skipped, 1);
    }

    #[test]
    fn test_no_logs_skips_state() {
        let manager = manager(SubscriptionConfig::default());
        subscribe(&manager, "0x1", USER, Box::<PlainEncryptor>::default());

        let delivery = manager
            .deliver_for_batch(&BATCH, &[receipt(vec![]), receipt(vec![])])
            .unwrap();

        assert!(delivery.is_empty());
        assert_eq!(manager.state_provider().snapshot_requests(), 0);
    }

    #[test]
    fn test_one_snapshot_per_batch() {
        let manager = manager(SubscriptionConfig::default());
        subscribe(&manager, "0x1", USER, Box::<PlainEncryptor>::default());
        subscribe(&manager, "0x2", [0x22; 20], Box::<PlainEncryptor>::default());

        manager
            .deliver_for_batch(
                &BATCH,
                &[receipt(vec![log(0, vec![])]), receipt(vec![log(1, vec![])])],
            )
            .unwrap();

        assert_eq!(manager.state_provider().snapshot_requests(), 1);
    }

    #[test]
    fn test_missing_state_aborts_batch() {
        let manager = manager(SubscriptionConfig::default());
        subscribe(&manager, "0x1", USER, Box::<PlainEncryptor>::default());

        let result = manager.deliver_for_batch(&[0xFF; 32], &[receipt(vec![log(0, vec![])])]);

        assert!(matches!(result, Err(EventsError::StateLookupFailure { .. })));
        assert_eq!(manager.metrics().snapshot().delivery_failures, 1);
    }

    #[test]
    fn test_private_log_only_to_subject() {
        let manager = manager(SubscriptionConfig::default());
        subscribe(&manager, "user", USER, Box::<PlainEncryptor>::default());
        subscribe(&manager, "other", [0x22; 20], Box::<PlainEncryptor>::default());

        let private = log(0, vec![[0xEE; 32], padded(&USER)]);
        let lifecycle = log(1, vec![[0xEE; 32]]);
        let delivery = manager
            .deliver_for_batch(&BATCH, &[receipt(vec![private.clone(), lifecycle.clone()])])
            .unwrap();

        assert_eq!(delivered_logs(&delivery, "user"), vec![private, lifecycle.clone()]);
        assert_eq!(delivered_logs(&delivery, "other"), vec![lifecycle]);
    }

    #[test]
    fn test_repeated_log_key_does_not_share_subjects() {
        let manager = manager(SubscriptionConfig::default());
        let bob: Address = [0x22; 20];
        subscribe(&manager, "alice", USER, Box::<PlainEncryptor>::default());
        subscribe(&manager, "bob", bob, Box::<PlainEncryptor>::default());

        // Producer restarted log_index per receipt: both logs have key (BATCH, 0)
        let about_alice = log(0, vec![[0xEE; 32], padded(&USER)]);
        let mut about_bob = log(0, vec![[0xEE; 32], padded(&bob)]);
        about_bob.data = vec![0xB0];
        assert_eq!(about_alice.key(), about_bob.key());

        let delivery = manager
            .deliver_for_batch(
                &BATCH,
                &[receipt(vec![about_alice.clone()]), receipt(vec![about_bob.clone()])],
            )
            .unwrap();

        assert_eq!(delivered_logs(&delivery, "alice"), vec![about_alice]);
        assert_eq!(delivered_logs(&delivery, "bob"), vec![about_bob]);
    }

    #[test]
    fn test_empty_results_omitted() {
        let manager = manager(SubscriptionConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        subscribe(
            &manager,
            "other",
            [0x22; 20],
            Box::new(PlainEncryptor {
                calls: Arc::clone(&calls),
            }),
        );

        let delivery = manager
            .deliver_for_batch(&BATCH, &[receipt(vec![log(0, vec![[0xEE; 32], padded(&USER)])])])
            .unwrap();

        assert!(delivery.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_receipt_then_log_order_preserved() {
        let manager = manager(SubscriptionConfig::default());
        subscribe(&manager, "0x1", USER, Box::<PlainEncryptor>::default());

        let delivery = manager
            .deliver_for_batch(
                &BATCH,
                &[
                    receipt(vec![log(3, vec![]), log(1, vec![])]),
                    receipt(vec![log(2, vec![])]),
                ],
            )
            .unwrap();

        let indexes: Vec<u32> = delivered_logs(&delivery, "0x1")
            .iter()
            .map(|l| l.log_index)
            .collect();
        assert_eq!(indexes, vec![3, 1, 2]);
    }

    #[test]
    fn test_encryption_failure_discards_batch() {
        for parallel in [true, false] {
            let manager = manager(SubscriptionConfig::default().with_parallel_encryption(parallel));
            subscribe(&manager, "good", USER, Box::<PlainEncryptor>::default());
            subscribe(&manager, "bad", USER, Box::new(FailingEncryptor));

            let result = manager.deliver_for_batch(&BATCH, &[receipt(vec![log(0, vec![])])]);

            match result {
                Err(EventsError::DeliveryFailed {
                    subscription_id,
                    account,
                    batch_hash,
                    source,
                }) => {
                    assert_eq!(subscription_id, "bad");
                    assert_eq!(account, USER);
                    assert_eq!(batch_hash, BATCH);
                    assert!(matches!(*source, EventsError::EncryptionFailure(_)));
                }
                other => panic!("expected DeliveryFailed, got {other:?}"),
            }
            assert_eq!(manager.metrics().snapshot().ciphertexts_produced, 0);
        }
    }

    #[test]
    fn test_removed_mid_pass_dropped() {
        let manager = Arc::new(manager(SubscriptionConfig::default()));
        let handle = Arc::clone(&manager);
        subscribe(
            &manager,
            "leaving",
            USER,
            Box::new(HookEncryptor {
                on_encrypt: Box::new(move || handle.remove_subscription("leaving")),
            }),
        );
        subscribe(&manager, "staying", USER, Box::<PlainEncryptor>::default());

        let delivery = manager
            .deliver_for_batch(&BATCH, &[receipt(vec![log(0, vec![])])])
            .unwrap();

        assert!(!delivery.contains_key("leaving"));
        assert!(delivery.contains_key("staying"));
    }

    #[test]
    fn test_overwritten_mid_pass_dropped() {
        let manager = Arc::new(manager(SubscriptionConfig::default()));
        let handle = Arc::clone(&manager);
        subscribe(
            &manager,
            "0x1",
            USER,
            Box::new(HookEncryptor {
                on_encrypt: Box::new(move || {
                    subscribe(&handle, "0x1", USER, Box::<PlainEncryptor>::default());
                }),
            }),
        );

        let delivery = manager
            .deliver_for_batch(&BATCH, &[receipt(vec![log(0, vec![])])])
            .unwrap();

        assert!(delivery.is_empty());
        assert_eq!(manager.registry().len(), 1);
    }

    #[test]
    fn test_filter_logs_for_receipt() {
        let manager = manager(SubscriptionConfig::default());
        let private = log(0, vec![[0xEE; 32], padded(&USER)]);
        let lifecycle = log(1, vec![[0xEE; 32]]);
        let receipt = receipt(vec![private.clone(), lifecycle.clone()]);

        let mine = manager.filter_logs_for_receipt(&receipt, &USER).unwrap();
        assert_eq!(mine, vec![private, lifecycle.clone()]);

        let theirs = manager.filter_logs_for_receipt(&receipt, &[0x22; 20]).unwrap();
        assert_eq!(theirs, vec![lifecycle]);
    }

    #[test]
    fn test_filter_logs_for_receipt_missing_state() {
        let manager = manager(SubscriptionConfig::default());
        let mut receipt = receipt(vec![log(0, vec![])]);
        receipt.block_hash = [0xFF; 32];

        assert!(matches!(
            manager.filter_logs_for_receipt(&receipt, &USER),
            Err(EventsError::StateLookupFailure { .. })
        ));
    }
}
