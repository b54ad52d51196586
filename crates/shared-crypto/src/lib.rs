//! # Shared Crypto - Enclave Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256, EIP-191 | Address derivation, signed challenges |
//! | `ecdsa` | secp256k1 | Signer recovery, account signing |
//! | `ecies` | secp256k1 ECDH + HKDF-SHA256 + XChaCha20-Poly1305 | Encrypting to a public key |
//!
//! ## Security Properties
//!
//! - **Recovery**: high-S signatures are normalized, so either form recovers
//! - **ECIES**: fresh ephemeral key and nonce per message, so ciphertexts of
//!   equal plaintexts never repeat
//! - **Key material**: derived symmetric keys are zeroized after use

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod ecies;
pub mod errors;
pub mod hashing;

// Re-exports
pub use ecdsa::{address_from_public_key, recover_address, Secp256k1KeyPair, SIGNATURE_LEN};
pub use errors::CryptoError;
pub use hashing::{eip191_hash, keccak256};
