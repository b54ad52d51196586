//! # Inbound Ports (Driving Ports / API)
//!
//! The API exposed to the transport and batch-ingestion layers.

use crate::domain::entities::{EncryptedSubscriptionLogs, SubscriptionId};
use crate::domain::errors::EventsError;
use shared_types::{Address, Hash, Log, Receipt};

/// Confidential log subscription API.
///
/// Implementations must be thread-safe (`Send + Sync`): admission, removal
/// and delivery may run concurrently.
pub trait SubscriptionApi: Send + Sync {
    /// Decrypt, decode and authorize a registration, then store it under `id`.
    ///
    /// Re-using an id replaces the previous subscription. On any error
    /// nothing is stored.
    fn add_subscription(
        &self,
        id: SubscriptionId,
        encrypted_payload: &[u8],
    ) -> Result<(), EventsError>;

    /// Remove the subscription under `id`. A missing id is a no-op.
    fn remove_subscription(&self, id: &str);

    /// Filter, privacy-gate and encrypt a batch's logs for every live
    /// subscription.
    ///
    /// Subscriptions with nothing to receive are absent from the result.
    ///
    /// # Errors
    /// * `EventsError::StateLookupFailure` - no state for `batch_hash`
    /// * `EventsError::DeliveryFailed` - a subscription's payload could not
    ///   be serialized or encrypted; nothing is returned for the batch
    fn deliver_for_batch(
        &self,
        batch_hash: &Hash,
        receipts: &[Receipt],
    ) -> Result<EncryptedSubscriptionLogs, EventsError>;

    /// The logs in `receipt` that `account` is allowed to see, in plaintext.
    ///
    /// The caller must already be authenticated as `account`.
    fn filter_logs_for_receipt(
        &self,
        receipt: &Receipt,
        account: &Address,
    ) -> Result<Vec<Log>, EventsError>;
}
