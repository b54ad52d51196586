//! Enclave key pair that decrypts inbound registrations.

use crate::domain::errors::EventsError;
use crate::ports::outbound::InboundDecryptor;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use shared_crypto::ecies;

/// Decrypts registration payloads addressed to the enclave's own key.
///
/// Clients encrypt their [`SubscriptionRequest`](crate::SubscriptionRequest)
/// to [`public_key`](Self::public_key) with ECIES.
pub struct EnclaveKeyDecryptor {
    secret: SecretKey,
}

impl EnclaveKeyDecryptor {
    pub fn new(secret: SecretKey) -> Self {
        Self { secret }
    }

    /// Load from raw 32-byte secret key material.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EventsError> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| EventsError::InvalidKey("invalid enclave secret key".to_string()))?;
        Ok(Self::new(secret))
    }

    /// Generate a fresh enclave key.
    pub fn generate() -> Self {
        Self::new(SecretKey::random(&mut rand::thread_rng()))
    }

    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    /// Compressed SEC1 encoding of the public key, for publishing to clients.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key().to_encoded_point(true).as_bytes().to_vec()
    }
}

impl std::fmt::Debug for EnclaveKeyDecryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnclaveKeyDecryptor")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

impl InboundDecryptor for EnclaveKeyDecryptor {
    fn decrypt(&self, payload: &[u8]) -> Result<Vec<u8>, EventsError> {
        ecies::decrypt(&self.secret, payload)
            .map_err(|e| EventsError::DecryptionFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrypts_payload_for_enclave() {
        let enclave = EnclaveKeyDecryptor::generate();
        let payload = ecies::encrypt(&enclave.public_key(), b"registration").unwrap();

        assert_eq!(enclave.decrypt(&payload).unwrap(), b"registration");
    }

    #[test]
    fn test_misdirected_payload_rejected() {
        let enclave = EnclaveKeyDecryptor::generate();
        let other = EnclaveKeyDecryptor::generate();
        let payload = ecies::encrypt(&other.public_key(), b"registration").unwrap();

        assert!(matches!(
            enclave.decrypt(&payload),
            Err(EventsError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let enclave = EnclaveKeyDecryptor::generate();
        assert!(matches!(
            enclave.decrypt(&[0u8; 8]),
            Err(EventsError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_from_bytes() {
        let enclave = EnclaveKeyDecryptor::generate();
        let restored = EnclaveKeyDecryptor::from_bytes(&enclave.secret.to_bytes()).unwrap();
        assert_eq!(restored.public_key(), enclave.public_key());

        assert!(matches!(
            EnclaveKeyDecryptor::from_bytes(&[0u8; 32]),
            Err(EventsError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let enclave = EnclaveKeyDecryptor::generate();
        let rendered = format!("{enclave:?}");
        assert!(!rendered.contains(&hex::encode(enclave.secret.to_bytes())));
    }
}
