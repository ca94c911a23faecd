//! Point-in-time copy of one shard's lock records

use serde::{Deserialize, Serialize};

use crate::error::LockError;

use super::table::decode_lock;
use super::{KeyRange, RangeEntries, lock_key};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Raw lock records of a shard, in key order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocksSnapshot {
    pub version: u32,
    pub entries: RangeEntries,
}

impl LocksSnapshot {
    pub fn new(entries: RangeEntries) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            entries,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, LockError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, LockError> {
        serde_json::from_slice(bytes).map_err(|e| LockError::InvalidSnapshot(e.to_string()))
    }

    /// Check that the snapshot can be installed into `range`: every key lies in the range
    /// and holds a valid record of the lock it encodes
    pub fn validate(&self, range: &KeyRange) -> Result<(), LockError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(LockError::InvalidSnapshot(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }

        for (key, value) in &self.entries {
            if !range.contains(key) {
                return Err(LockError::InvalidSnapshot(format!(
                    "key {} is outside the shard range",
                    const_hex::encode(key)
                )));
            }
            let lock = decode_lock(key, value)
                .map_err(|e| LockError::InvalidSnapshot(e.to_string()))?;
            if lock_key(&lock.id)? != *key {
                return Err(LockError::InvalidSnapshot(format!(
                    "key {} holds the record of lock {}",
                    const_hex::encode(key),
                    lock.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::{Lock, LockHolder, LockId, LockStatus};
    use crate::store::{ShardBounds, lock_key, locks_table_range};

    fn entry(lock_name: &str) -> (Vec<u8>, Vec<u8>) {
        let lock = Lock {
            id: LockId::new(1, "ns", lock_name),
            status: LockStatus::WriteLocked {
                locked_at: 1,
                holder: LockHolder::new("p", 1, 2),
            },
        };
        (lock_key(&lock.id).unwrap(), serde_json::to_vec(&lock).unwrap())
    }

    #[test]
    fn test_encode_decode() {
        let snapshot = LocksSnapshot::new(vec![entry("a"), entry("b")]);
        let decoded = LocksSnapshot::decode(&snapshot.encode().unwrap()).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.entries.len(), 2);
    }

    #[test]
    fn test_decode_garbage() {
        let err = LocksSnapshot::decode(b"not json").unwrap_err();
        assert!(matches!(err, LockError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_validate() {
        let range = locks_table_range(&ShardBounds::full());
        assert!(LocksSnapshot::new(vec![entry("a")]).validate(&range).is_ok());

        let mut snapshot = LocksSnapshot::new(vec![entry("a")]);
        snapshot.version = 2;
        assert!(snapshot.validate(&range).is_err());

        let foreign = LocksSnapshot::new(vec![(vec![0x02, 0x00], b"{}".to_vec())]);
        let err = foreign.validate(&range).unwrap_err();
        assert!(err.to_string().contains("outside the shard range"));

        let (key, _) = entry("a");
        let corrupt = LocksSnapshot::new(vec![(key, b"{}".to_vec())]);
        assert!(matches!(
            corrupt.validate(&range),
            Err(LockError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn test_validate_rejects_record_under_another_locks_key() {
        let range = locks_table_range(&ShardBounds::full());
        let (key_a, _) = entry("a");
        let (_, record_b) = entry("b");

        let swapped = LocksSnapshot::new(vec![(key_a, record_b)]);
        let err = swapped.validate(&range).unwrap_err();
        assert!(matches!(err, LockError::InvalidSnapshot(_)));
        assert!(err.to_string().contains("1/ns/b"));
    }
}
