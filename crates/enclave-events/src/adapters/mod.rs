//! # Adapters
//!
//! Concrete implementations of the outbound ports.
//!
//! - [`codec`]: bincode registration payload codec
//! - [`enclave_key`]: ECIES decryption with the enclave's secret key
//! - [`memory_state`]: in-memory account state, for tests and local tooling

pub mod codec;
pub mod enclave_key;
pub mod memory_state;

pub use codec::BincodeSubscriptionCodec;
pub use enclave_key::EnclaveKeyDecryptor;
pub use memory_state::{InMemoryAccountState, InMemoryStateProvider};
