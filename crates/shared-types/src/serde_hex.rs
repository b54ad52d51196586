//! `0x`-prefixed hex (de)serialization for byte fields.
//!
//! Used with `#[serde(with = "...")]` so that logs render the way Ethereum
//! JSON-RPC clients expect while staying plain byte arrays in memory.

use serde::{Deserialize, Deserializer, Serializer};

fn encode(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn decode<E: serde::de::Error>(s: &str) -> Result<Vec<u8>, E> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped).map_err(E::custom)
}

fn to_array<E: serde::de::Error, const N: usize>(bytes: Vec<u8>) -> Result<[u8; N], E> {
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| E::custom(format!("expected {N} bytes, got {len}")))
}

/// Fixed-width byte arrays (`Address`, `Hash`).
pub mod fixed {
    use super::*;

    pub fn serialize<S: Serializer, const N: usize>(
        value: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        to_array(decode::<D::Error>(&s)?)
    }
}

/// A sequence of fixed-width words (log topics).
pub mod fixed_vec {
    use super::*;
    use serde::ser::SerializeSeq;

    pub fn serialize<S: Serializer, const N: usize>(
        values: &[[u8; N]],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&encode(value))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<Vec<[u8; N]>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|s| decode::<D::Error>(s).and_then(to_array))
            .collect()
    }
}

/// Variable-length byte strings (log data).
pub mod bytes {
    use super::*;

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode::<D::Error>(&s)
    }
}
