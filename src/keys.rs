//! Key encoding and decoding utilities
//!
//! All keys use a single-byte prefix followed by binary data.
//! Integers are big-endian so RocksDB iterates them in numeric order.

use anyhow::Result;

/// Encode a header key.
///
/// Format: byte 'H' (0x48) + header_id (8 bytes, big-endian)
/// Total length: 9 bytes
pub fn encode_header_key(header_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(b'H');
    key.extend_from_slice(&header_id.to_be_bytes());
    key
}

/// Encode a block number index key.
///
/// Format: byte 'N' (0x4E) + block_number (8 bytes) + header_id (8 bytes)
/// Total length: 17 bytes
///
/// Several headers can share a block number after a reorg, so the id is
/// part of the key.
pub fn encode_block_number_key(block_number: u64, header_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(17);
    key.push(b'N');
    key.extend_from_slice(&block_number.to_be_bytes());
    key.extend_from_slice(&header_id.to_be_bytes());
    key
}

/// Decode a block number index key into (block_number, header_id).
pub fn decode_block_number_key(key: &[u8]) -> Result<(u64, u64)> {
    if key.len() != 17 || key[0] != b'N' {
        anyhow::bail!("Invalid block number key: {}", hex::encode(key));
    }
    let block_number = u64::from_be_bytes(key[1..9].try_into()?);
    let header_id = u64::from_be_bytes(key[9..17].try_into()?);
    Ok((block_number, header_id))
}

/// Encode the prefix shared by all records of one event for one header.
///
/// Format: byte 'R' (0x52) + event name + 0x00 + header_id (8 bytes)
pub fn encode_record_prefix(event: &str, header_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(event.len() + 10);
    key.push(b'R');
    key.extend_from_slice(event.as_bytes());
    key.push(0x00);
    key.extend_from_slice(&header_id.to_be_bytes());
    key
}

/// Encode a record key.
///
/// Format: record prefix + occurrence (8 bytes, big-endian)
pub fn encode_record_key(event: &str, header_id: u64, occurrence: u64) -> Vec<u8> {
    let mut key = encode_record_prefix(event, header_id);
    key.extend_from_slice(&occurrence.to_be_bytes());
    key
}

/// Encode a checked-header key.
///
/// Format: byte 'K' (0x4B) + event name + 0x00 + header_id (8 bytes)
pub fn encode_checked_key(event: &str, header_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(event.len() + 10);
    key.push(b'K');
    key.extend_from_slice(event.as_bytes());
    key.push(0x00);
    key.extend_from_slice(&header_id.to_be_bytes());
    key
}

/// Encode a meta key.
///
/// Format: byte 'M' (0x4D) + meta_id (1 byte)
/// Total length: 2 bytes
///
/// Meta IDs:
/// - 0x01: next header id
pub fn encode_meta_key(meta_id: u8) -> Vec<u8> {
    vec![b'M', meta_id]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_key_encoding() {
        let key = encode_header_key(12345);
        assert_eq!(key.len(), 9);
        assert_eq!(key[0], b'H');
        assert_eq!(u64::from_be_bytes(key[1..9].try_into().unwrap()), 12345);
    }

    #[test]
    fn test_block_number_key_roundtrip() {
        let key = encode_block_number_key(67890, 4);
        assert_eq!(key.len(), 17);
        assert_eq!(decode_block_number_key(&key).unwrap(), (67890, 4));
        assert!(decode_block_number_key(&key[..9]).is_err());
    }

    #[test]
    fn test_block_number_keys_sort_numerically() {
        let low = encode_block_number_key(255, 9);
        let high = encode_block_number_key(256, 1);
        assert!(low < high);
    }

    #[test]
    fn test_record_key_extends_prefix() {
        let prefix = encode_record_prefix("FlipKick", 3);
        let key = encode_record_key("FlipKick", 3, 2);
        assert!(key.starts_with(&prefix));
        assert_eq!(key.len(), prefix.len() + 8);

        // Event names must not bleed into each other
        let other = encode_record_prefix("FlipKickX", 3);
        assert!(!other.starts_with(&prefix));
    }

    #[test]
    fn test_checked_key_encoding() {
        let key = encode_checked_key("FlipKick", 1);
        assert_eq!(key[0], b'K');
        assert_eq!(&key[1..9], b"FlipKick");
        assert_eq!(key[9], 0x00);
    }

    #[test]
    fn test_meta_key_encoding() {
        let key = encode_meta_key(0x01);
        assert_eq!(key, vec![b'M', 0x01]);
    }
}
