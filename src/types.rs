//! Ethereum JSON-RPC types
//!
//! The raw log record returned by `eth_getLogs`, plus the hex
//! deserialization helpers used to read it.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Log entry emitted by a contract, as returned by the node.
///
/// Transient: read during one transformer run and never stored as-is
/// (models keep a JSON copy of it in their `raw` field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    /// Address of the contract that emitted the log
    #[serde(rename = "address", deserialize_with = "deserialize_hex_address")]
    pub address: Address,

    /// Indexed topics (topic0 = event signature, topics[1..] = indexed params)
    #[serde(rename = "topics", default, deserialize_with = "deserialize_hex_b256_vec")]
    pub topics: Vec<B256>,

    /// Non-indexed event data
    #[serde(rename = "data", serialize_with = "serialize_hex_bytes", deserialize_with = "deserialize_hex_bytes")]
    pub data: Vec<u8>,

    /// Block containing the log
    #[serde(rename = "blockNumber", serialize_with = "serialize_hex_u64", deserialize_with = "deserialize_hex_u64")]
    pub block_number: u64,

    #[serde(rename = "blockHash", deserialize_with = "deserialize_hex_b256")]
    pub block_hash: B256,

    #[serde(rename = "transactionHash", deserialize_with = "deserialize_hex_b256")]
    pub transaction_hash: B256,

    #[serde(rename = "transactionIndex", serialize_with = "serialize_hex_u64", deserialize_with = "deserialize_hex_u64")]
    pub transaction_index: u64,

    /// Position of the log within the block
    #[serde(rename = "logIndex", serialize_with = "serialize_hex_u64", deserialize_with = "deserialize_hex_u64")]
    pub log_index: u64,

    /// True if the log was dropped by a chain reorganization
    #[serde(rename = "removed", default)]
    pub removed: bool,
}

impl RawLog {
    /// First topic, the event signature hash for non-anonymous events.
    pub fn topic0(&self) -> Option<B256> {
        self.topics.first().copied()
    }
}

// Hex deserialization helpers

/// Pad an odd-length hex string with a leading zero.
/// RPC endpoints sometimes return quantities without leading zeros.
pub(crate) fn pad_hex_string(s: &str) -> String {
    if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

/// Parse a hex string of at most 32 bytes into a word, left-padding short
/// input.
pub fn parse_b256_padded(s: &str) -> Result<B256, hex::FromHexError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(pad_hex_string(s))?;
    if bytes.len() > 32 {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(B256::from(word))
}

/// Serialize a u64 as a 0x-prefixed hex quantity, the way nodes return it.
fn serialize_hex_u64<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("0x{:x}", value))
}

/// Serialize bytes as a 0x-prefixed hex string.
fn serialize_hex_bytes<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("0x{}", hex::encode(value)))
}

/// Deserialize a hex string to u64.
fn deserialize_hex_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    u64::from_str_radix(s, 16).map_err(serde::de::Error::custom)
}

fn decode_b256<E: serde::de::Error>(s: &str) -> Result<B256, E> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(pad_hex_string(s)).map_err(E::custom)?;
    if bytes.len() != 32 {
        return Err(E::custom(format!(
            "Expected 32 bytes for hash, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

/// Deserialize a hex string to B256.
fn deserialize_hex_b256<'de, D>(deserializer: D) -> Result<B256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    decode_b256(&s)
}

/// Deserialize a list of hex strings to B256 words.
fn deserialize_hex_b256_vec<'de, D>(deserializer: D) -> Result<Vec<B256>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Vec::<String>::deserialize(deserializer)?;
    items.iter().map(|s| decode_b256(s)).collect()
}

/// Deserialize a hex string to Address.
fn deserialize_hex_address<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    let bytes = hex::decode(pad_hex_string(s)).map_err(serde::de::Error::custom)?;
    if bytes.len() != 20 {
        return Err(serde::de::Error::custom(format!(
            "Expected 20 bytes for address, got {}",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

/// Deserialize a hex string to bytes.
fn deserialize_hex_bytes<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    if s.is_empty() {
        Ok(Vec::new())
    } else {
        hex::decode(pad_hex_string(s)).map_err(serde::de::Error::custom)
    }
}
