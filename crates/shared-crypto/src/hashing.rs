//! # Keccak Hashing
//!
//! Keccak-256 and the EIP-191 personal-message hash used by wallets when
//! signing human-readable challenges.

use sha3::{Digest, Keccak256};
use shared_types::Hash;

/// Prefix wallets prepend before hashing a personal message.
pub const EIP191_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Keccak-256 hash of `data` (one-shot).
pub fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

/// EIP-191 personal-message hash:
/// `keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)`.
pub fn eip191_hash(message: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(EIP191_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}
