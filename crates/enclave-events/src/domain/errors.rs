//! # Event Subsystem Errors
//!
//! Every failure is returned to the immediate caller with the context needed
//! to act on it (subscription id, account, batch). Nothing is swallowed.

use super::entities::SubscriptionId;
use shared_crypto::CryptoError;
use shared_types::{to_hex, Address, Hash};
use thiserror::Error;

/// Errors that can occur while admitting subscriptions or delivering logs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventsError {
    /// The signature recovers to a different account under every supported
    /// challenge format.
    #[error("invalid viewing key signature for requested account {}", to_hex(.account))]
    InvalidSignature { account: Address },

    /// The viewing public key could not be decompressed.
    #[error("invalid viewing key: {0}")]
    InvalidKey(String),

    /// The inbound registration payload could not be decrypted.
    #[error("could not decrypt subscription payload: {0}")]
    DecryptionFailure(String),

    /// The decrypted registration payload is not a valid subscription request.
    #[error("could not decode subscription payload: {0}")]
    DecodeFailure(String),

    /// No account-state snapshot for the requested block or batch. Fatal to
    /// the delivery pass.
    #[error("could not create state snapshot at {}: {reason}", to_hex(.block_hash))]
    StateLookupFailure { block_hash: Hash, reason: String },

    /// The viewing-key encryption primitive failed.
    #[error("unable to encrypt with viewing key: {0}")]
    EncryptionFailure(String),

    /// Logs could not be serialized for encryption.
    #[error("could not serialize logs: {0}")]
    SerializationFailure(String),

    /// Delivery to one subscription failed, aborting the whole batch.
    #[error(
        "delivery for subscription {subscription_id} (account {}) failed in batch {}: {source}",
        to_hex(.account),
        to_hex(.batch_hash)
    )]
    DeliveryFailed {
        subscription_id: SubscriptionId,
        account: Address,
        batch_hash: Hash,
        #[source]
        source: Box<EventsError>,
    },

    /// Admitting a new subscription id would exceed the configured capacity.
    #[error("subscription registry full: {max} live subscriptions")]
    RegistryFull { max: usize },

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EventsError {
    /// True for errors raised while admitting a subscription.
    pub fn is_admission_error(&self) -> bool {
        matches!(
            self,
            EventsError::InvalidSignature { .. }
                | EventsError::InvalidKey(_)
                | EventsError::DecryptionFailure(_)
                | EventsError::DecodeFailure(_)
                | EventsError::RegistryFull { .. }
        )
    }
}

impl From<CryptoError> for EventsError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::EncryptionFailed(reason) => EventsError::EncryptionFailure(reason),
            CryptoError::DecryptionFailed(_) | CryptoError::CiphertextTooShort { .. } => {
                EventsError::DecryptionFailure(err.to_string())
            }
            other => EventsError::EncryptionFailure(other.to_string()),
        }
    }
}
