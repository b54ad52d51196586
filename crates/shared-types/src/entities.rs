//! # Core Domain Entities
//!
//! Execution outputs consumed by the enclave's event subsystem.
//!
//! ## Clusters
//!
//! - **Primitives**: `Address`, `Hash`, `BlockNumber`
//! - **Execution Output**: `Log`, `Receipt`

use crate::serde_hex;
use serde::{Deserialize, Serialize};

// =============================================================================
// CLUSTER A: PRIMITIVES
// =============================================================================

/// A 32-byte hash (Keccak-256) or a 32-byte log topic word.
pub type Hash = [u8; 32];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// Block (or batch) height.
pub type BlockNumber = u64;

/// Width of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Width of a hash or topic word in bytes.
pub const HASH_LEN: usize = 32;

/// Render an address or hash as `0x`-prefixed lowercase hex.
///
/// Used in log fields and error messages.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

// =============================================================================
// CLUSTER B: EXECUTION OUTPUT
// =============================================================================

/// An event log emitted during transaction execution.
///
/// Topic 0 is the event signature hash; topics 1..N are the indexed event
/// arguments, each a full 32-byte word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    /// Contract that emitted the log.
    #[serde(with = "serde_hex::fixed")]
    pub address: Address,
    /// Ordered topics.
    #[serde(with = "serde_hex::fixed_vec")]
    pub topics: Vec<Hash>,
    /// Non-indexed event data.
    #[serde(with = "serde_hex::bytes")]
    pub data: Vec<u8>,
    /// Height of the block (batch) containing the transaction.
    pub block_number: BlockNumber,
    /// Hash of the transaction that emitted the log.
    #[serde(with = "serde_hex::fixed")]
    pub transaction_hash: Hash,
    /// Index of the transaction within the block.
    pub transaction_index: u32,
    /// Hash of the block (batch) containing the transaction.
    #[serde(with = "serde_hex::fixed")]
    pub block_hash: Hash,
    /// Index of the log within the block.
    pub log_index: u32,
    /// True if the log was reverted by a reorg.
    #[serde(default)]
    pub removed: bool,
}

impl Log {
    /// Content-derived identity of this log: `(block_hash, log_index)`.
    ///
    /// Unique within a chain, unlike object identity, which differs between
    /// copies of the same receipt.
    pub fn key(&self) -> LogKey {
        LogKey {
            block_hash: self.block_hash,
            log_index: self.log_index,
        }
    }

    /// The indexed arguments of the event (every topic except the signature).
    pub fn indexed_topics(&self) -> &[Hash] {
        self.topics.get(1..).unwrap_or(&[])
    }
}

/// Identity of a log within the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogKey {
    /// Block the log was emitted in.
    pub block_hash: Hash,
    /// Position of the log within that block.
    pub log_index: u32,
}

/// The result of executing one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Hash of the executed transaction.
    #[serde(with = "serde_hex::fixed")]
    pub transaction_hash: Hash,
    /// Hash of the block (batch) the transaction was included in.
    #[serde(with = "serde_hex::fixed")]
    pub block_hash: Hash,
    /// Height of that block (batch).
    pub block_number: BlockNumber,
    /// 1 for success, 0 for failure.
    pub status: u8,
    /// Logs emitted, in emission order.
    pub logs: Vec<Log>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> Log {
        Log {
            address: [0xAA; 20],
            topics: vec![[0x11; 32], [0x22; 32]],
            data: vec![0xde, 0xad],
            block_number: 7,
            transaction_hash: [0x33; 32],
            transaction_index: 0,
            block_hash: [0x44; 32],
            log_index: 3,
            removed: false,
        }
    }

    #[test]
    fn test_log_json_shape() {
        let json = serde_json::to_value(sample_log()).unwrap();

        assert_eq!(json["address"], format!("0x{}", "aa".repeat(20)));
        assert_eq!(json["topics"][1], format!("0x{}", "22".repeat(32)));
        assert_eq!(json["data"], "0xdead");
        assert_eq!(json["blockNumber"], 7);
        assert_eq!(json["logIndex"], 3);
    }

    #[test]
    fn test_log_json_roundtrip() {
        let log = sample_log();
        let json = serde_json::to_string(&log).unwrap();
        let decoded: Log = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, log);
    }

    #[test]
    fn test_log_bincode_roundtrip() {
        let log = sample_log();
        let bytes = bincode::serialize(&log).unwrap();
        let decoded: Log = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, log);
    }

    #[test]
    fn test_wrong_width_rejected() {
        let mut json = serde_json::to_value(sample_log()).unwrap();
        json["address"] = serde_json::Value::String("0xaabb".into());
        assert!(serde_json::from_value::<Log>(json).is_err());
    }

    #[test]
    fn test_indexed_topics_skips_signature() {
        let log = sample_log();
        assert_eq!(log.indexed_topics(), &[[0x22; 32]]);

        let anonymous = Log {
            topics: vec![],
            ..sample_log()
        };
        assert!(anonymous.indexed_topics().is_empty());
    }

    #[test]
    fn test_log_key_is_content_derived() {
        let a = sample_log();
        let b = a.clone();
        assert_eq!(a.key(), b.key());

        let c = Log {
            log_index: 4,
            ..sample_log()
        };
        assert_ne!(a.key(), c.key());
    }
}
