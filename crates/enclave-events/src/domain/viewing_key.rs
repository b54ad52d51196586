//! # Viewing-Key Authorization
//!
//! Binds a caller-supplied encryption public key to an on-chain account by
//! checking a signature over a challenge message, then exposes the key as an
//! [`EncryptionHandle`].
//!
//! ## Challenge Formats
//!
//! Wallets have signed two different challenges over time. The caller does not
//! say which one it used, so every format in [`SUPPORTED_CHALLENGES`] is tried
//! on every call. Retiring a format is a one-line edit to that list.
//!
//! ## Security Notes
//!
//! - An `EncryptionHandle` is only constructed after a matching signature
//! - Recovered and requested addresses are compared in constant time
//! - A high-S signature is accepted like its low-S twin
//! - Encryption is randomized; no two ciphertexts are comparable

use super::errors::EventsError;
use k256::PublicKey;
use shared_crypto::{ecies, eip191_hash, recover_address};
use shared_types::{to_hex, Address};
use subtle::{Choice, ConstantTimeEq};
use tracing::trace;

/// Length of a compressed secp256k1 viewing public key.
pub const VIEWING_KEY_LEN: usize = 33;

/// Encrypted in place of an empty payload, which ECIES cannot carry
/// meaningfully.
pub const PLACEHOLDER_PLAINTEXT: &[u8] = b"0x";

/// Encrypts a delivery payload for exactly one subscriber.
pub trait LogEncryptor: Send + Sync {
    /// Encrypt `plaintext`. Each call uses fresh randomness.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EventsError>;
}

// =============================================================================
// CHALLENGE FORMATS
// =============================================================================

/// Builds the exact message a wallet was asked to sign.
pub type ChallengeBuilder = fn(viewing_key: &[u8], account: &Address) -> String;

/// A named challenge message format.
#[derive(Clone, Copy)]
pub struct ChallengeFormat {
    /// Short name used in logs.
    pub name: &'static str,
    build: ChallengeBuilder,
}

impl ChallengeFormat {
    /// Reconstruct the signed message for this format.
    pub fn message(&self, viewing_key: &[u8], account: &Address) -> String {
        (self.build)(viewing_key, account)
    }
}

impl std::fmt::Debug for ChallengeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ChallengeFormat").field(&self.name).finish()
    }
}

fn registration_message(viewing_key: &[u8], account: &Address) -> String {
    format!("Register {} for {}", hex::encode(viewing_key), to_hex(account))
}

fn legacy_message(viewing_key: &[u8], _account: &Address) -> String {
    format!("vk{}", hex::encode(viewing_key))
}

/// Current format, binding the key to the account:
/// `Register <hex(key)> for 0x<account>`.
pub const REGISTRATION_CHALLENGE: ChallengeFormat = ChallengeFormat {
    name: "registration",
    build: registration_message,
};

/// Legacy format, key only: `vk<hex(key)>`.
pub const LEGACY_CHALLENGE: ChallengeFormat = ChallengeFormat {
    name: "legacy",
    build: legacy_message,
};

/// Formats accepted by default, in the order they are tried.
pub const SUPPORTED_CHALLENGES: &[ChallengeFormat] = &[REGISTRATION_CHALLENGE, LEGACY_CHALLENGE];

// =============================================================================
// AUTHORIZER
// =============================================================================

/// Verifies viewing-key signatures. Stateless.
#[derive(Debug, Clone, Copy)]
pub struct ViewingKeyAuthorizer {
    challenges: &'static [ChallengeFormat],
}

impl Default for ViewingKeyAuthorizer {
    fn default() -> Self {
        Self {
            challenges: SUPPORTED_CHALLENGES,
        }
    }
}

impl ViewingKeyAuthorizer {
    /// Create an authorizer accepting every supported challenge format.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the accepted challenge formats.
    pub fn with_challenges(challenges: &'static [ChallengeFormat]) -> Self {
        Self { challenges }
    }

    /// Authorize `viewing_key` for `account`.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` if no challenge format recovers `account`
    /// - `InvalidKey` if the viewing key is not a compressed curve point
    pub fn authorize(
        &self,
        account: &Address,
        viewing_key: &[u8],
        signature: &[u8],
    ) -> Result<EncryptionHandle, EventsError> {
        let mut matched = Choice::from(0u8);

        // Every format is attempted, even after a match
        for format in self.challenges {
            let prehash = eip191_hash(format.message(viewing_key, account).as_bytes());
            match recover_address(&prehash, signature) {
                Ok(recovered) => {
                    let is_match = recovered[..].ct_eq(&account[..]);
                    trace!(
                        format = format.name,
                        matched = bool::from(is_match),
                        "Checked viewing key challenge"
                    );
                    matched |= is_match;
                }
                Err(e) => {
                    trace!(format = format.name, error = %e, "Viewing key signature did not recover");
                }
            }
        }

        if !bool::from(matched) {
            return Err(EventsError::InvalidSignature { account: *account });
        }

        EncryptionHandle::from_compressed(viewing_key)
    }
}

/// Authorize with every supported challenge format.
pub fn authorize(
    account: &Address,
    viewing_key: &[u8],
    signature: &[u8],
) -> Result<EncryptionHandle, EventsError> {
    ViewingKeyAuthorizer::default().authorize(account, viewing_key, signature)
}

// =============================================================================
// ENCRYPTION HANDLE
// =============================================================================

/// A viewing public key proven to belong to an account.
#[derive(Debug)]
pub struct EncryptionHandle {
    public_viewing_key: PublicKey,
}

impl EncryptionHandle {
    fn from_compressed(viewing_key: &[u8]) -> Result<Self, EventsError> {
        if viewing_key.len() != VIEWING_KEY_LEN {
            return Err(EventsError::InvalidKey(format!(
                "expected {VIEWING_KEY_LEN}-byte compressed key, got {} bytes",
                viewing_key.len()
            )));
        }

        let public_viewing_key = PublicKey::from_sec1_bytes(viewing_key).map_err(|_| {
            EventsError::InvalidKey("could not decompress viewing key bytes".into())
        })?;

        Ok(Self { public_viewing_key })
    }

    /// The bound viewing public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_viewing_key
    }
}

impl LogEncryptor for EncryptionHandle {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EventsError> {
        let payload = if plaintext.is_empty() {
            PLACEHOLDER_PLAINTEXT
        } else {
            plaintext
        };

        ecies::encrypt(&self.public_viewing_key, payload)
            .map_err(|e| EventsError::EncryptionFailure(e.to_string()))
    }
}
