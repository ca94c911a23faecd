//! In-memory lock store for tests and embedding

use std::collections::BTreeMap;

use parking_lot::{Mutex, MutexGuard};

use crate::error::LockError;

use super::{KeyRange, LockStore, LockTxn, RangeEntries};

type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

/// Ordered map behind a mutex. One transaction holds the mutex from `begin` until it is
/// committed or dropped.
#[derive(Default)]
pub struct MemoryLockStore {
    data: Mutex<Tree>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    /// Copy of every stored pair
    pub fn dump(&self) -> RangeEntries {
        self.data
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

pub struct MemoryTxn<'a> {
    data: MutexGuard<'a, Tree>,
    /// `None` marks a staged delete
    staged: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl LockTxn for MemoryTxn<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LockError> {
        if let Some(staged) = self.staged.get(key) {
            return Ok(staged.clone());
        }
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), LockError> {
        self.staged.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), LockError> {
        self.staged.insert(key.to_vec(), None);
        Ok(())
    }

    fn commit(mut self) -> Result<(), LockError> {
        for (key, value) in std::mem::take(&mut self.staged) {
            match value {
                Some(value) => {
                    self.data.insert(key, value);
                }
                None => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

impl LockStore for MemoryLockStore {
    type Txn<'a> = MemoryTxn<'a>;

    fn begin(&self) -> Result<Self::Txn<'_>, LockError> {
        Ok(MemoryTxn {
            data: self.data.lock(),
            staged: BTreeMap::new(),
        })
    }

    fn scan_range(&self, range: &KeyRange) -> Result<RangeEntries, LockError> {
        let data = self.data.lock();
        Ok(data
            .range(range.start.clone()..)
            .take_while(|(k, _)| range.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn replace_range(&self, range: &KeyRange, entries: RangeEntries) -> Result<(), LockError> {
        let mut data = self.data.lock();
        data.retain(|k, _| !range.contains(k));
        data.extend(entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: &[u8], end: Option<&[u8]>) -> KeyRange {
        KeyRange {
            start: start.to_vec(),
            end: end.map(<[u8]>::to_vec),
        }
    }

    #[test]
    fn test_txn_reads_own_writes() {
        let store = MemoryLockStore::new();
        let mut txn = store.begin().unwrap();
        txn.put(b"a", b"1".to_vec()).unwrap();
        assert_eq!(txn.get(b"a").unwrap(), Some(b"1".to_vec()));
        txn.delete(b"a").unwrap();
        assert_eq!(txn.get(b"a").unwrap(), None);
    }

    #[test]
    fn test_drop_discards_staged_writes() {
        let store = MemoryLockStore::new();
        {
            let mut txn = store.begin().unwrap();
            txn.put(b"a", b"1".to_vec()).unwrap();
        }
        assert!(store.is_empty());

        let mut txn = store.begin().unwrap();
        txn.put(b"a", b"1".to_vec()).unwrap();
        txn.commit().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_scan_and_replace_range() {
        let store = MemoryLockStore::new();
        let mut txn = store.begin().unwrap();
        for key in [b"a", b"b", b"c", b"d"] {
            txn.put(key, key.to_vec()).unwrap();
        }
        txn.commit().unwrap();

        let middle = range(b"b", Some(b"d"));
        let entries = store.scan_range(&middle).unwrap();
        assert_eq!(
            entries,
            vec![(b"b".to_vec(), b"b".to_vec()), (b"c".to_vec(), b"c".to_vec())]
        );

        store
            .replace_range(&middle, vec![(b"bb".to_vec(), b"x".to_vec())])
            .unwrap();
        let keys: Vec<Vec<u8>> = store.dump().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![b"a".to_vec(), b"bb".to_vec(), b"d".to_vec()]
        );

        let tail = store.scan_range(&range(b"c", None)).unwrap();
        assert_eq!(tail.len(), 1);
    }
}
