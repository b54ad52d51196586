//! # ECIES over secp256k1
//!
//! Encrypt to a secp256k1 public key so that only the holder of the matching
//! secret key can read the payload.
//!
//! ## Construction
//!
//! 1. Fresh ephemeral key pair per message
//! 2. ECDH between the ephemeral secret and the recipient public key
//! 3. HKDF-SHA256 (salt = ephemeral public key) to a 256-bit key
//! 4. XChaCha20-Poly1305 with a random 192-bit nonce
//!
//! Wire format: `ephemeral_pubkey (33) || nonce (24) || ciphertext || tag (16)`

use crate::CryptoError;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use k256::ecdh::{diffie_hellman, EphemeralSecret, SharedSecret};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

/// Size of the compressed ephemeral public key in bytes.
pub const EPHEMERAL_KEY_SIZE: usize = 33;

/// Size of the XChaCha20-Poly1305 nonce in bytes.
pub const NONCE_SIZE: usize = 24;

/// Size of the Poly1305 authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Fixed per-message overhead.
pub const OVERHEAD: usize = EPHEMERAL_KEY_SIZE + NONCE_SIZE + TAG_SIZE;

/// HKDF info string for deriving the symmetric key.
const HKDF_INFO: &[u8] = b"enclave-ecies-secp256k1-v1";

/// Encrypts `plaintext` to `recipient`.
///
/// Randomized: two calls with the same inputs never produce the same output.
pub fn encrypt(recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let ephemeral_secret = EphemeralSecret::random(&mut rand::thread_rng());
    let ephemeral_public = ephemeral_secret.public_key().to_encoded_point(true);

    let shared_secret = ephemeral_secret.diffie_hellman(recipient);
    let cipher = derive_cipher(&shared_secret, ephemeral_public.as_bytes())?;

    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut output = Vec::with_capacity(EPHEMERAL_KEY_SIZE + NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(ephemeral_public.as_bytes());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);

    Ok(output)
}

/// Decrypts an ECIES ciphertext with the recipient's secret key.
pub fn decrypt(secret_key: &SecretKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < OVERHEAD {
        return Err(CryptoError::CiphertextTooShort {
            minimum: OVERHEAD,
            actual: ciphertext.len(),
        });
    }

    let (ephemeral_bytes, rest) = ciphertext.split_at(EPHEMERAL_KEY_SIZE);
    let (nonce, sealed) = rest.split_at(NONCE_SIZE);

    let ephemeral_public = PublicKey::from_sec1_bytes(ephemeral_bytes)
        .map_err(|_| CryptoError::DecryptionFailed("invalid ephemeral public key".into()))?;

    let shared_secret = diffie_hellman(secret_key.to_nonzero_scalar(), ephemeral_public.as_affine());
    let cipher = derive_cipher(&shared_secret, ephemeral_bytes)?;

    cipher
        .decrypt(XNonce::from_slice(nonce), sealed)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

fn derive_cipher(
    shared_secret: &SharedSecret,
    ephemeral_public: &[u8],
) -> Result<XChaCha20Poly1305, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(ephemeral_public), shared_secret.raw_secret_bytes());
    let mut key = [0u8; 32];
    hk.expand(HKDF_INFO, &mut key)
        .map_err(|_| CryptoError::EncryptionFailed("HKDF expansion failed".into()))?;

    let cipher = XChaCha20Poly1305::new_from_slice(&key)
        .map_err(|e| CryptoError::EncryptionFailed(format!("cipher init failed: {e}")));
    key.zeroize();
    cipher
}
