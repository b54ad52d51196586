//! # Outbound Ports (Driven Ports / SPI)
//!
//! Collaborators the surrounding node must provide: inbound payload
//! decryption, payload decoding and pinned account-state access.

use crate::domain::entities::SubscriptionRequest;
use crate::domain::errors::EventsError;
use shared_types::{Address, Hash};
use std::sync::Arc;

/// Read-only account state pinned to one block or batch.
pub trait AccountStateReader: Send + Sync {
    /// Transaction count of `address`; zero if the account does not exist.
    fn nonce(&self, address: &Address) -> u64;

    /// Contract code at `address`, or `None` for an externally owned account.
    fn code(&self, address: &Address) -> Option<Vec<u8>>;
}

/// Produces account-state snapshots.
pub trait StateProvider: Send + Sync {
    /// Snapshot of account state exactly as of `block_hash`.
    ///
    /// # Errors
    /// * `EventsError::StateLookupFailure` - no state for that block
    fn state_at(&self, block_hash: &Hash) -> Result<Arc<dyn AccountStateReader>, EventsError>;
}

/// The node's confidential decryption primitive for registration payloads.
pub trait InboundDecryptor: Send + Sync {
    /// Decrypt an inbound payload.
    ///
    /// # Errors
    /// * `EventsError::DecryptionFailure` - malformed or misdirected payload
    fn decrypt(&self, payload: &[u8]) -> Result<Vec<u8>, EventsError>;
}

/// Canonical decoding of a registration payload.
pub trait SubscriptionDecoder: Send + Sync {
    /// Decode plaintext into a subscription request.
    ///
    /// # Errors
    /// * `EventsError::DecodeFailure` - not a valid request
    fn decode(&self, plaintext: &[u8]) -> Result<SubscriptionRequest, EventsError>;
}
