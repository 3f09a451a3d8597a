//! Key encoding and decoding utilities
//!
//! All keys use a single-byte prefix followed by binary data.
//! Integers are big-endian so that lexicographic order in RocksDB
//! matches numeric order.
//!
//! Layout:
//! - `t` + txid (32 bytes) -> tx record
//! - `b` + height (4 bytes) -> block record
//! - `H` + height (4 bytes) + txid (32 bytes) -> empty (txids by height)
//! - `M` + meta id (1 byte) -> meta values

use crate::error::IndexError;
use alloy_primitives::B256;

/// Tx record family tag.
pub const TX_PREFIX: u8 = b't';
/// Block record family tag.
pub const BLOCK_PREFIX: u8 = b'b';
/// Height index family tag.
pub const HEIGHT_PREFIX: u8 = b'H';
/// Meta family tag.
pub const META_PREFIX: u8 = b'M';

/// Meta id of the index tip.
pub const META_TIP: u8 = 0x01;

/// Length of a height index key.
pub const HEIGHT_KEY_LEN: usize = 37;

/// Encode a tx record key.
///
/// Format: byte 't' (0x74) + txid (32 bytes)
/// Total length: 33 bytes
pub fn encode_tx_key(txid: B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(TX_PREFIX);
    key.extend_from_slice(txid.as_slice());
    key
}

/// Encode a block record key.
///
/// Format: byte 'b' (0x62) + height (4 bytes, big-endian)
/// Total length: 5 bytes
pub fn encode_block_key(height: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.push(BLOCK_PREFIX);
    key.extend_from_slice(&height.to_be_bytes());
    key
}

/// Encode a height index key.
///
/// Format: byte 'H' (0x48) + height (4 bytes, big-endian) + txid (32 bytes)
/// Total length: 37 bytes
pub fn encode_height_key(height: u32, txid: B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(HEIGHT_KEY_LEN);
    key.push(HEIGHT_PREFIX);
    key.extend_from_slice(&height.to_be_bytes());
    key.extend_from_slice(txid.as_slice());
    key
}

/// Smallest height index key at `height`.
pub fn height_key_min(height: u32) -> Vec<u8> {
    encode_height_key(height, B256::ZERO)
}

/// Largest height index key at `height`.
pub fn height_key_max(height: u32) -> Vec<u8> {
    encode_height_key(height, B256::repeat_byte(0xff))
}

/// Decode a height index key into (height, txid).
pub fn decode_height_key(key: &[u8]) -> Result<(u32, B256), IndexError> {
    if key.len() != HEIGHT_KEY_LEN || key[0] != HEIGHT_PREFIX {
        return Err(IndexError::MalformedRecord {
            kind: "height index key",
            expected: HEIGHT_KEY_LEN,
            actual: key.len(),
        });
    }
    let mut height = [0u8; 4];
    height.copy_from_slice(&key[1..5]);
    Ok((u32::from_be_bytes(height), B256::from_slice(&key[5..])))
}

/// Encode a meta key.
///
/// Format: byte 'M' (0x4D) + meta_id (1 byte)
///
/// Meta IDs:
/// - 0x01: index tip
pub fn encode_meta_key(meta_id: u8) -> Vec<u8> {
    vec![META_PREFIX, meta_id]
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;
    use proptest::prelude::*;

    #[test]
    fn test_tx_key_encoding() {
        let txid = b256!("0000000000000000000000000000000000000000000000000000000000000001");
        let key = encode_tx_key(txid);
        assert_eq!(key.len(), 33);
        assert_eq!(key[0], b't');
        assert_eq!(&key[1..], txid.as_slice());
    }

    #[test]
    fn test_block_key_encoding() {
        let key = encode_block_key(67890);
        assert_eq!(key.len(), 5);
        assert_eq!(key[0], b'b');
        assert_eq!(u32::from_be_bytes(key[1..5].try_into().unwrap()), 67890);
    }

    #[test]
    fn test_height_key_roundtrip() {
        let txid = b256!("abcdef1234567890abcdef1234567890abcdef1234567890abcdef1234567890");
        let key = encode_height_key(12345, txid);
        assert_eq!(key.len(), HEIGHT_KEY_LEN);
        assert_eq!(key[0], b'H');
        assert_eq!(decode_height_key(&key).unwrap(), (12345, txid));
    }

    #[test]
    fn test_height_keys_sort_numerically() {
        // 255 < 256 must hold byte-wise too
        let a = encode_height_key(255, B256::repeat_byte(0xff));
        let b = encode_height_key(256, B256::ZERO);
        assert!(a < b);
        assert!(height_key_min(7) < height_key_max(7));
        assert!(height_key_max(7) < height_key_min(8));
    }

    #[test]
    fn test_decode_height_key_rejects_bad_length() {
        let key = encode_block_key(1);
        assert!(matches!(
            decode_height_key(&key),
            Err(IndexError::MalformedRecord { actual: 5, .. })
        ));
    }

    #[test]
    fn test_meta_key_encoding() {
        let key = encode_meta_key(META_TIP);
        assert_eq!(key, vec![b'M', 0x01]);
    }

    proptest! {
        #[test]
        fn prop_height_key_order_matches_tuple_order(
            a in (any::<u32>(), any::<[u8; 32]>()),
            b in (any::<u32>(), any::<[u8; 32]>()),
        ) {
            let key_a = encode_height_key(a.0, B256::from(a.1));
            let key_b = encode_height_key(b.0, B256::from(b.1));
            prop_assert_eq!(key_a.cmp(&key_b), a.cmp(&b));
        }

        #[test]
        fn prop_height_key_within_bounds(height in any::<u32>(), txid in any::<[u8; 32]>()) {
            let key = encode_height_key(height, B256::from(txid));
            prop_assert!(height_key_min(height) <= key && key <= height_key_max(height));
            prop_assert_eq!(decode_height_key(&key).unwrap(), (height, B256::from(txid)));
        }
    }
}
