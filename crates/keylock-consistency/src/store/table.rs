//! Typed access to lock records inside a transaction

use crate::error::LockError;
use crate::lock::{Lock, LockId};

use super::LockTxn;
use super::keys::lock_key;

/// Lock records keyed by [`LockId`], read and written through one open transaction
pub struct LocksTable<'t, T: LockTxn> {
    txn: &'t mut T,
}

impl<'t, T: LockTxn> LocksTable<'t, T> {
    pub fn new(txn: &'t mut T) -> Self {
        Self { txn }
    }

    /// The stored record for `id`, or `None` when the lock is implicitly unlocked
    pub fn get(&self, id: &LockId) -> Result<Option<Lock>, LockError> {
        let key = lock_key(id)?;
        let Some(bytes) = self.txn.get(&key)? else {
            return Ok(None);
        };

        let lock = decode_lock(&key, &bytes)?;
        if lock.id != *id {
            return Err(corrupted(
                &key,
                format!("record belongs to lock {}, expected {}", lock.id, id),
            ));
        }
        Ok(Some(lock))
    }

    /// Stage `lock`; an unlocked lock removes the record
    pub fn set(&mut self, lock: &Lock) -> Result<(), LockError> {
        let key = lock_key(&lock.id)?;
        if lock.is_unlocked() {
            return self.txn.delete(&key);
        }

        lock.check_invariants()
            .map_err(|reason| corrupted(&key, reason))?;
        let bytes = serde_json::to_vec(lock)?;
        self.txn.put(&key, bytes)
    }

    /// Whether a record exists for `id`, without decoding it
    pub fn contains(&self, id: &LockId) -> Result<bool, LockError> {
        Ok(self.txn.get(&lock_key(id)?)?.is_some())
    }

    pub fn delete(&mut self, id: &LockId) -> Result<(), LockError> {
        self.txn.delete(&lock_key(id)?)
    }
}

/// Decode a stored record, reporting any failure as corruption
pub fn decode_lock(key: &[u8], bytes: &[u8]) -> Result<Lock, LockError> {
    let lock: Lock =
        serde_json::from_slice(bytes).map_err(|e| corrupted(key, e.to_string()))?;
    if lock.is_unlocked() {
        return Err(corrupted(key, "UNLOCKED record persisted".to_string()));
    }
    lock.check_invariants().map_err(|reason| corrupted(key, reason))?;
    Ok(lock)
}

fn corrupted(key: &[u8], reason: String) -> LockError {
    LockError::CorruptedRecord {
        key: const_hex::encode(key),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::{LockHolder, LockStatus};
    use crate::store::{LockStore, MemoryLockStore};

    fn write_locked(id: LockId) -> Lock {
        Lock {
            id,
            status: LockStatus::WriteLocked {
                locked_at: 10,
                holder: LockHolder::new("process_1", 10, 20),
            },
        }
    }

    #[test]
    fn test_set_and_get() {
        let store = MemoryLockStore::new();
        let id = LockId::new(1, "ns", "lock");

        let mut txn = store.begin().unwrap();
        let mut table = LocksTable::new(&mut txn);
        assert!(table.get(&id).unwrap().is_none());

        table.set(&write_locked(id.clone())).unwrap();
        assert_eq!(table.get(&id).unwrap(), Some(write_locked(id.clone())));
        txn.commit().unwrap();

        let mut txn = store.begin().unwrap();
        let table = LocksTable::new(&mut txn);
        assert_eq!(table.get(&id).unwrap(), Some(write_locked(id)));
    }

    #[test]
    fn test_set_unlocked_deletes_record() {
        let store = MemoryLockStore::new();
        let id = LockId::new(1, "ns", "lock");

        let mut txn = store.begin().unwrap();
        let mut table = LocksTable::new(&mut txn);
        table.set(&write_locked(id.clone())).unwrap();
        table.set(&Lock::unlocked(id.clone())).unwrap();
        assert!(table.get(&id).unwrap().is_none());
        txn.commit().unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn test_set_rejects_invalid_reader_set() {
        let store = MemoryLockStore::new();
        let lock = Lock {
            id: LockId::new(1, "ns", "lock"),
            status: LockStatus::ReadLocked {
                locked_at: 1,
                holders: vec![LockHolder::new("p", 1, 2), LockHolder::new("p", 1, 3)],
            },
        };

        let mut txn = store.begin().unwrap();
        let err = LocksTable::new(&mut txn).set(&lock).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_garbage_record_is_corruption() {
        let store = MemoryLockStore::new();
        let id = LockId::new(1, "ns", "lock");
        let key = lock_key(&id).unwrap();

        let mut txn = store.begin().unwrap();
        txn.put(&key, br#"{"state":"HALF_LOCKED"}"#.to_vec()).unwrap();
        let err = LocksTable::new(&mut txn).get(&id).unwrap_err();
        match err {
            LockError::CorruptedRecord { key: hex_key, .. } => {
                assert_eq!(hex_key, const_hex::encode(&key));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_record_under_foreign_key_is_corruption() {
        let store = MemoryLockStore::new();
        let id = LockId::new(1, "ns", "lock");
        let other = write_locked(LockId::new(1, "ns", "other"));

        let mut txn = store.begin().unwrap();
        txn.put(&lock_key(&id).unwrap(), serde_json::to_vec(&other).unwrap())
            .unwrap();
        let err = LocksTable::new(&mut txn).get(&id).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("expected 1/ns/lock"));
    }

    #[test]
    fn test_persisted_unlocked_record_is_corruption() {
        let id = LockId::new(1, "ns", "lock");
        let bytes = serde_json::to_vec(&Lock::unlocked(id.clone())).unwrap();
        let err = decode_lock(&lock_key(&id).unwrap(), &bytes).unwrap_err();
        assert!(err.is_fatal());
    }
}
