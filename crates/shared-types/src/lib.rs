//! # Shared Types Crate
//!
//! Chain entities consumed by the enclave's event subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Address`, `Hash`, `Log` and `Receipt` are
//!   defined here and nowhere else.
//! - **Read-only Inputs**: Logs and receipts are produced by execution; the
//!   event subsystem only reads them.
//! - **JSON-RPC Shape**: Logs serialize exactly as Ethereum clients expect
//!   them, since the serialized form is what subscribers decrypt.

pub mod entities;
pub mod serde_hex;

pub use entities::*;
