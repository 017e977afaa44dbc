//! Snapshot encoding.
//!
//! ```text
//! ┌────────────┬─────────────┬──────────────────┬─────────────┐
//! │ magic (4)  │ version (2) │ CBOR payload (N) │ crc32 (4)   │
//! └────────────┴─────────────┴──────────────────┴─────────────┘
//! ```
//!
//! Integers are little-endian. The checksum covers everything before it.

use crate::error::{CoreError, CoreResult};
use crate::mvcc::VersionChain;
use crate::types::{Key, TransactionId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Magic bytes of the version chain snapshot.
pub const STORE_MAGIC: [u8; 4] = *b"VKVD";

/// Magic bytes of the manager state snapshot.
pub const MANAGER_MAGIC: [u8; 4] = *b"VKVS";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

const HEADER_SIZE: usize = 6;
const FOOTER_SIZE: usize = 4;

/// All version chains, ordered by key.
pub type StoreSnapshot = BTreeMap<Key, VersionChain>;

/// Saved transaction manager state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerSnapshot {
    /// The next Tid `begin` would hand out.
    pub next_tid: TransactionId,
    /// Transactions active when the snapshot was taken.
    pub active: Vec<TransactionId>,
}

impl Default for ManagerSnapshot {
    fn default() -> Self {
        Self {
            next_tid: TransactionId::new(1),
            active: Vec::new(),
        }
    }
}

/// Encodes the version chains.
///
/// # Errors
///
/// Returns an error if CBOR serialization fails.
pub fn encode_store(snapshot: &StoreSnapshot) -> CoreResult<Vec<u8>> {
    encode(STORE_MAGIC, snapshot)
}

/// Decodes the version chains.
///
/// # Errors
///
/// Returns `SnapshotCorrupted` if the bytes are not a valid store snapshot.
pub fn decode_store(data: &[u8]) -> CoreResult<StoreSnapshot> {
    decode(STORE_MAGIC, data)
}

/// Encodes the manager state.
///
/// # Errors
///
/// Returns an error if CBOR serialization fails.
pub fn encode_manager(snapshot: &ManagerSnapshot) -> CoreResult<Vec<u8>> {
    encode(MANAGER_MAGIC, snapshot)
}

/// Decodes the manager state.
///
/// # Errors
///
/// Returns `SnapshotCorrupted` if the bytes are not a valid manager snapshot.
pub fn decode_manager(data: &[u8]) -> CoreResult<ManagerSnapshot> {
    decode(MANAGER_MAGIC, data)
}

fn encode<T: Serialize>(magic: [u8; 4], value: &T) -> CoreResult<Vec<u8>> {
    let mut data = Vec::with_capacity(256);
    data.extend_from_slice(&magic);
    data.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    ciborium::into_writer(value, &mut data)
        .map_err(|e| CoreError::invalid_format(format!("snapshot encoding failed: {e}")))?;
    let checksum = compute_crc32(&data);
    data.extend_from_slice(&checksum.to_le_bytes());
    Ok(data)
}

fn decode<T: DeserializeOwned>(magic: [u8; 4], data: &[u8]) -> CoreResult<T> {
    if data.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(CoreError::snapshot_corrupted("snapshot too small"));
    }
    if data[0..4] != magic {
        return Err(CoreError::snapshot_corrupted("invalid snapshot magic"));
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != SNAPSHOT_VERSION {
        return Err(CoreError::snapshot_corrupted(format!(
            "unsupported snapshot version: {version}"
        )));
    }

    let checksum_offset = data.len() - FOOTER_SIZE;
    let mut stored = [0u8; 4];
    stored.copy_from_slice(&data[checksum_offset..]);
    let stored = u32::from_le_bytes(stored);
    let computed = compute_crc32(&data[..checksum_offset]);
    if stored != computed {
        return Err(CoreError::snapshot_corrupted(format!(
            "checksum mismatch: expected {stored:#010x}, got {computed:#010x}"
        )));
    }

    ciborium::from_reader(&data[HEADER_SIZE..checksum_offset])
        .map_err(|e| CoreError::snapshot_corrupted(format!("invalid payload: {e}")))
}

/// CRC32 (IEEE polynomial).
fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mvcc::Version;

    fn sample_store() -> StoreSnapshot {
        let t1 = TransactionId::new(1);
        let t2 = TransactionId::new(2);
        let mut snapshot = StoreSnapshot::new();
        snapshot.insert(
            Key::from("x"),
            VersionChain::from_versions(vec![
                Version {
                    value: Some(1),
                    tid_begin: t1,
                    tid_end: t2,
                },
                Version::open(None, t2),
            ]),
        );
        snapshot.insert(Key::from("y"), VersionChain::single(Some(7), t1));
        snapshot
    }

    #[test]
    fn crc32_known_value() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn store_snapshot_survives_encoding() {
        let snapshot = sample_store();
        let bytes = encode_store(&snapshot).unwrap();
        assert_eq!(&bytes[0..4], b"VKVD");
        assert_eq!(decode_store(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn manager_snapshot_survives_encoding() {
        let snapshot = ManagerSnapshot {
            next_tid: TransactionId::new(42),
            active: vec![TransactionId::new(40), TransactionId::new(41)],
        };
        let bytes = encode_manager(&snapshot).unwrap();
        assert_eq!(decode_manager(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn default_manager_snapshot_starts_at_one() {
        let snapshot = ManagerSnapshot::default();
        assert_eq!(snapshot.next_tid, TransactionId::new(1));
        assert!(snapshot.active.is_empty());
    }

    #[test]
    fn wrong_magic_rejected() {
        let bytes = encode_manager(&ManagerSnapshot::default()).unwrap();
        let result = decode_store(&bytes);
        assert!(matches!(result, Err(CoreError::SnapshotCorrupted { .. })));
    }

    #[test]
    fn truncated_snapshot_rejected() {
        let result = decode_store(b"VKV");
        assert!(matches!(result, Err(CoreError::SnapshotCorrupted { .. })));
    }

    #[test]
    fn flipped_byte_rejected() {
        let mut bytes = encode_store(&sample_store()).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xFF;
        let result = decode_store(&bytes);
        assert!(matches!(result, Err(CoreError::SnapshotCorrupted { .. })));
    }

    #[test]
    fn future_version_rejected() {
        let mut bytes = encode_store(&sample_store()).unwrap();
        bytes[4] = 9;
        let result = decode_store(&bytes);
        assert!(matches!(result, Err(CoreError::SnapshotCorrupted { .. })));
    }
}
