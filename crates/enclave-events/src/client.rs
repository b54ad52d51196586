//! # Client-Side Viewing Key
//!
//! What a wallet or SDK does to subscribe: generate a viewing key pair, sign
//! the challenge binding it to the account, encrypt the registration to the
//! enclave, and later decrypt delivered logs.

use crate::adapters::codec::BincodeSubscriptionCodec;
use crate::domain::entities::{FilterCriteria, SubscriptionRequest};
use crate::domain::errors::EventsError;
use crate::domain::viewing_key::ChallengeFormat;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use shared_crypto::{ecies, Secp256k1KeyPair};
use shared_types::{to_hex, Address, Log};

/// A viewing key pair signed over by an account.
pub struct ViewingKey {
    account: Address,
    secret: SecretKey,
    public_key_bytes: Vec<u8>,
    signature: Vec<u8>,
}

impl ViewingKey {
    /// Generate a fresh viewing key and sign `format`'s challenge with the
    /// account key.
    pub fn generate(
        account: &Secp256k1KeyPair,
        format: &ChallengeFormat,
    ) -> Result<Self, EventsError> {
        Self::from_secret(account, format, SecretKey::random(&mut rand::thread_rng()))
    }

    /// Bind an existing viewing secret to the account.
    pub fn from_secret(
        account: &Secp256k1KeyPair,
        format: &ChallengeFormat,
        secret: SecretKey,
    ) -> Result<Self, EventsError> {
        let public_key_bytes = secret.public_key().to_encoded_point(true).as_bytes().to_vec();
        let address = account.address();
        let message = format.message(&public_key_bytes, &address);
        let signature = account.sign_personal_message(message.as_bytes())?;

        Ok(Self {
            account: address,
            secret,
            public_key_bytes,
            signature: signature.to_vec(),
        })
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// Compressed viewing public key.
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key_bytes
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Plaintext registration for `filter`.
    pub fn subscription_request(&self, filter: FilterCriteria) -> SubscriptionRequest {
        SubscriptionRequest {
            account: self.account,
            signature: self.signature.clone(),
            public_viewing_key: self.public_key_bytes.clone(),
            filter,
        }
    }

    /// Registration for `filter`, encoded and encrypted to the enclave.
    pub fn registration_payload(
        &self,
        filter: FilterCriteria,
        enclave_key: &PublicKey,
    ) -> Result<Vec<u8>, EventsError> {
        let plaintext = BincodeSubscriptionCodec.encode(&self.subscription_request(filter))?;
        ecies::encrypt(enclave_key, &plaintext).map_err(EventsError::from)
    }

    /// Decrypt a ciphertext delivered for this viewing key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, EventsError> {
        ecies::decrypt(&self.secret, ciphertext)
            .map_err(|e| EventsError::DecryptionFailure(e.to_string()))
    }

    /// Decrypt a delivery and parse the JSON log array inside it.
    pub fn decrypt_logs(&self, ciphertext: &[u8]) -> Result<Vec<Log>, EventsError> {
        let plaintext = self.decrypt(ciphertext)?;
        serde_json::from_slice(&plaintext).map_err(|e| EventsError::DecodeFailure(e.to_string()))
    }
}

impl std::fmt::Debug for ViewingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewingKey")
            .field("account", &to_hex(&self.account))
            .field("public_key", &to_hex(&self.public_key_bytes))
            .finish_non_exhaustive()
    }
}
