//! Bincode codec for registration payloads.

use crate::domain::entities::SubscriptionRequest;
use crate::domain::errors::EventsError;
use crate::ports::outbound::SubscriptionDecoder;
use bincode::Options;

/// Upper bound on an encoded registration payload.
pub const MAX_REQUEST_LEN: u64 = 64 * 1024;

/// Canonical bincode encoding of [`SubscriptionRequest`].
///
/// Decoding is size-limited and rejects trailing bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeSubscriptionCodec;

impl BincodeSubscriptionCodec {
    fn options() -> impl Options {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_limit(MAX_REQUEST_LEN)
    }

    /// Encode a request. Used on the client side.
    pub fn encode(&self, request: &SubscriptionRequest) -> Result<Vec<u8>, EventsError> {
        Self::options()
            .serialize(request)
            .map_err(|e| EventsError::SerializationFailure(e.to_string()))
    }
}

impl SubscriptionDecoder for BincodeSubscriptionCodec {
    fn decode(&self, plaintext: &[u8]) -> Result<SubscriptionRequest, EventsError> {
        Self::options()
            .deserialize(plaintext)
            .map_err(|e| EventsError::DecodeFailure(e.to_string()))
    }
}
