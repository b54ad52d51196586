//! # ECDSA Signatures (secp256k1)
//!
//! Signer recovery for wallet-produced signatures, and the matching signing
//! side used by clients.
//!
//! ## Security Properties
//!
//! - High-S signatures are folded to low S with the parity flipped before
//!   recovery, so both malleable forms recover the same signer
//! - Signing always emits low S (EIP-2)
//! - Recovery IDs accepted in both raw (0/1) and wallet (27/28) form
//! - Signing keys are zeroized on drop by k256

use crate::hashing::{eip191_hash, keccak256};
use crate::CryptoError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use shared_types::{Address, Hash};

/// Length of a recoverable signature: `r (32) || s (32) || v (1)`.
pub const SIGNATURE_LEN: usize = 65;

/// Recover the signer's address from a recoverable signature over `prehash`.
///
/// # Errors
///
/// - `InvalidSignatureLength` if `signature` is not 65 bytes
/// - `InvalidRecoveryId` if `v` is not 0, 1, 27 or 28
/// - `InvalidSignatureFormat` if `r` or `s` is out of range
/// - `RecoveryFailed` if no public key recovers
pub fn recover_address(prehash: &Hash, signature: &[u8]) -> Result<Address, CryptoError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(CryptoError::InvalidSignatureLength {
            expected: SIGNATURE_LEN,
            actual: signature.len(),
        });
    }

    let recovery_id = parse_recovery_id(signature[64])?;
    let sig =
        Signature::from_slice(&signature[..64]).map_err(|_| CryptoError::InvalidSignatureFormat)?;

    // k256 only recovers low-S signatures
    let (sig, recovery_id) = match sig.normalize_s() {
        Some(normalized) => (normalized, flip_parity(recovery_id)?),
        None => (sig, recovery_id),
    };

    let recovered_key = VerifyingKey::recover_from_prehash(prehash, &sig, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;

    Ok(address_from_public_key(&recovered_key))
}

/// Derive the Ethereum address of a public key: the last 20 bytes of
/// `keccak256(x || y)`.
pub fn address_from_public_key(public_key: &VerifyingKey) -> Address {
    let encoded = public_key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag
    let hash = keccak256(&encoded.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Parse recovery ID from v value.
///
/// Valid v values: 0, 1, 27, 28
fn parse_recovery_id(v: u8) -> Result<RecoveryId, CryptoError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(CryptoError::InvalidRecoveryId(v)),
    };

    RecoveryId::try_from(id).map_err(|_| CryptoError::InvalidRecoveryId(v))
}

/// Negating S mirrors R's y coordinate.
fn flip_parity(recovery_id: RecoveryId) -> Result<RecoveryId, CryptoError> {
    RecoveryId::from_byte(recovery_id.to_byte() ^ 1).ok_or(CryptoError::RecoveryFailed)
}

/// secp256k1 account key pair (the wallet side of a signed challenge).
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Address controlled by this key.
    pub fn address(&self) -> Address {
        address_from_public_key(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte prehash, producing `r || s || v` with low S and
    /// `v ∈ {27, 28}`.
    pub fn sign_prehash(&self, prehash: &Hash) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
        let (sig, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(prehash)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        // Normalize S to low value (EIP-2), flipping the y parity with it
        let (sig, recovery_id) = match sig.normalize_s() {
            Some(normalized) => (normalized, flip_parity(recovery_id)?),
            None => (sig, recovery_id),
        };

        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = recovery_id.to_byte() + 27;
        Ok(out)
    }

    /// Sign a personal message the way wallets do (EIP-191 prefix).
    pub fn sign_personal_message(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
        self.sign_prehash(&eip191_hash(message))
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}
