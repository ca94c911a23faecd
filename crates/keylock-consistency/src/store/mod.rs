//! Transactional key-value substrate used by the lock core
//!
//! A [`LockStore`] hands out one [`LockTxn`] at a time. Writes are staged inside the
//! transaction and become visible only on [`LockTxn::commit`]; dropping the transaction
//! discards them. Reads inside a transaction observe its own staged writes.

pub mod keys;
pub mod memory;
pub mod rocks;
pub mod snapshot;
pub mod table;

pub use keys::{KeyRange, LOCKS_TABLE_ID, SHARD_KEY_LEN, ShardBounds, lock_key, locks_table_range};
pub use memory::MemoryLockStore;
pub use rocks::{CF_LOCKS, RocksLockStore};
pub use snapshot::{LocksSnapshot, SNAPSHOT_VERSION};
pub use table::LocksTable;

use crate::error::LockError;

/// Ordered key/value pairs of one key range
pub type RangeEntries = Vec<(Vec<u8>, Vec<u8>)>;

/// One atomic read-modify-write unit
pub trait LockTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LockError>;

    fn put(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), LockError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), LockError>;

    /// Apply every staged write atomically
    fn commit(self) -> Result<(), LockError>;
}

/// Storage backend for one shard's lock table
pub trait LockStore: Send + Sync {
    type Txn<'a>: LockTxn
    where
        Self: 'a;

    /// Open a transaction; blocks while another transaction on this store is open
    fn begin(&self) -> Result<Self::Txn<'_>, LockError>;

    /// Every pair whose key lies in `range`, in key order
    fn scan_range(&self, range: &KeyRange) -> Result<RangeEntries, LockError>;

    /// Atomically replace the contents of `range` with `entries`
    fn replace_range(&self, range: &KeyRange, entries: RangeEntries) -> Result<(), LockError>;
}
