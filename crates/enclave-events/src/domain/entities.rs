//! # Domain Entities
//!
//! Subscription, filter and delivery data structures.

use super::viewing_key::LogEncryptor;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash};
use std::collections::HashMap;
use std::fmt;

/// Opaque subscription identifier, generated by the transport layer.
pub type SubscriptionId = String;

/// Ciphertext produced for each subscription in one delivery pass.
pub type EncryptedSubscriptionLogs = HashMap<SubscriptionId, Vec<u8>>;

/// Subscriber-declared log criteria.
///
/// Block bounds are signed so that negative JSON-RPC tags (latest, pending)
/// are representable; they are treated as "no bound".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Drop logs below this block when present and non-negative.
    pub from_block: Option<i64>,
    /// Drop logs above this block when present and positive.
    pub to_block: Option<i64>,
    /// Emitting contracts of interest; empty means any.
    pub addresses: Vec<Address>,
    /// Positional topic match-sets; an empty set is a wildcard.
    pub topics: Vec<Vec<Hash>>,
}

impl FilterCriteria {
    /// Criteria matching every log.
    pub fn any() -> Self {
        Self::default()
    }

    /// Builder-style method to set the block range
    pub fn with_block_range(mut self, from_block: Option<i64>, to_block: Option<i64>) -> Self {
        self.from_block = from_block;
        self.to_block = to_block;
        self
    }

    /// Builder-style method to set the address allow-list
    pub fn with_addresses(mut self, addresses: Vec<Address>) -> Self {
        self.addresses = addresses;
        self
    }

    /// Builder-style method to set the topic match-sets
    pub fn with_topics(mut self, topics: Vec<Vec<Hash>>) -> Self {
        self.topics = topics;
        self
    }
}

/// Decoded registration payload for a log subscription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// The account the subscriber claims to control.
    pub account: Address,
    /// Signature over the viewing-key challenge, `r || s || v`.
    pub signature: Vec<u8>,
    /// Compressed secp256k1 viewing public key (33 bytes).
    pub public_viewing_key: Vec<u8>,
    /// Criteria applied to the stream of logs.
    pub filter: FilterCriteria,
}

/// An authenticated, live log subscription.
///
/// Only built from a successful viewing-key authorization; immutable once
/// stored in the registry.
pub struct LogSubscription {
    /// The account the subscriber authenticated as.
    pub account: Address,
    /// Criteria applied to each batch's logs.
    pub filter: FilterCriteria,
    /// Encrypts delivered logs for this subscriber alone.
    pub encryptor: Box<dyn LogEncryptor>,
}

impl fmt::Debug for LogSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSubscription")
            .field("account", &shared_types::to_hex(&self.account))
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

/// Pairs a subscription id with the ciphertext produced for it.
///
/// The transport wraps this in its push envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAndEncryptedLogs {
    /// Subscription the ciphertext belongs to.
    pub subscription: SubscriptionId,
    /// Encrypted JSON array of logs.
    pub encrypted_logs: Vec<u8>,
}

impl IdAndEncryptedLogs {
    /// Flatten a delivery result into transport-ready pairs, sorted by id.
    pub fn from_delivery(delivery: EncryptedSubscriptionLogs) -> Vec<Self> {
        let mut pairs: Vec<Self> = delivery
            .into_iter()
            .map(|(subscription, encrypted_logs)| Self {
                subscription,
                encrypted_logs,
            })
            .collect();
        pairs.sort_by(|a, b| a.subscription.cmp(&b.subscription));
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_bincode_roundtrip() {
        let request = SubscriptionRequest {
            account: [0x01; 20],
            signature: vec![0x02; 65],
            public_viewing_key: vec![0x03; 33],
            filter: FilterCriteria::any()
                .with_block_range(Some(1), Some(-1))
                .with_addresses(vec![[0x04; 20]])
                .with_topics(vec![vec![], vec![[0x05; 32]]]),
        };

        let bytes = bincode::serialize(&request).unwrap();
        let decoded: SubscriptionRequest = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_pairs_sorted_by_id() {
        let mut delivery = EncryptedSubscriptionLogs::new();
        delivery.insert("0xb".into(), vec![2]);
        delivery.insert("0xa".into(), vec![1]);

        let pairs = IdAndEncryptedLogs::from_delivery(delivery);
        assert_eq!(pairs[0].subscription, "0xa");
        assert_eq!(pairs[1].encrypted_logs, vec![2]);
    }
}
