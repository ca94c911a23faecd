//! RocksDB-backed lock store

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rocksdb::{
    BlockBasedOptions, ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options,
    WriteBatch,
};
use tracing::info;

use crate::error::LockError;

use super::{KeyRange, LockStore, LockTxn, RangeEntries};

/// Column family holding the locks table
pub const CF_LOCKS: &str = "locks";

/// Lock store persisted in one RocksDB column family.
///
/// Transactions are serialized by a gate mutex and committed as a single `WriteBatch`.
pub struct RocksLockStore {
    db: Arc<DB>,
    gate: Mutex<()>,
}

impl RocksLockStore {
    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LockError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(16 * 1024 * 1024);
        db_opts.set_max_write_buffer_number(3);
        db_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let mut block_opts = BlockBasedOptions::default();
        let cache = rocksdb::Cache::new_lru_cache(32 * 1024 * 1024);
        block_opts.set_block_cache(&cache);
        // Bloom filter for point lookups of single locks
        block_opts.set_bloom_filter(10.0, false);

        let mut cf_opts = Options::default();
        cf_opts.set_write_buffer_size(16 * 1024 * 1024);
        cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        cf_opts.set_block_based_table_factory(&block_opts);

        let cfs = vec![ColumnFamilyDescriptor::new(CF_LOCKS, cf_opts)];
        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cfs)?;

        info!("RocksDB lock store opened at {}", path.as_ref().display());
        Self::from_db(Arc::new(db))
    }

    /// Wrap an already opened database that has the [`CF_LOCKS`] column family
    pub fn from_db(db: Arc<DB>) -> Result<Self, LockError> {
        let store = Self {
            db,
            gate: Mutex::new(()),
        };
        store.cf_locks()?;
        Ok(store)
    }

    fn cf_locks(&self) -> Result<&ColumnFamily, LockError> {
        self.db
            .cf_handle(CF_LOCKS)
            .ok_or_else(|| LockError::Storage(format!("column family '{CF_LOCKS}' not found")))
    }

    fn scan_locked(&self, range: &KeyRange) -> Result<RangeEntries, LockError> {
        let cf = self.cf_locks()?;
        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(range.start.as_slice(), Direction::Forward),
        );

        let mut entries = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !range.contains(&key) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }
}

pub struct RocksTxn<'a> {
    store: &'a RocksLockStore,
    _gate: MutexGuard<'a, ()>,
    /// `None` marks a staged delete
    staged: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl LockTxn for RocksTxn<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LockError> {
        if let Some(staged) = self.staged.get(key) {
            return Ok(staged.clone());
        }
        let cf = self.store.cf_locks()?;
        Ok(self.store.db.get_cf(cf, key)?)
    }

    fn put(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), LockError> {
        self.staged.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), LockError> {
        self.staged.insert(key.to_vec(), None);
        Ok(())
    }

    fn commit(self) -> Result<(), LockError> {
        if self.staged.is_empty() {
            return Ok(());
        }

        let cf = self.store.cf_locks()?;
        let mut batch = WriteBatch::default();
        for (key, value) in &self.staged {
            match value {
                Some(value) => batch.put_cf(cf, key, value),
                None => batch.delete_cf(cf, key),
            }
        }
        self.store.db.write(batch)?;
        Ok(())
    }
}

impl LockStore for RocksLockStore {
    type Txn<'a> = RocksTxn<'a>;

    fn begin(&self) -> Result<Self::Txn<'_>, LockError> {
        Ok(RocksTxn {
            store: self,
            _gate: self.gate.lock(),
            staged: BTreeMap::new(),
        })
    }

    fn scan_range(&self, range: &KeyRange) -> Result<RangeEntries, LockError> {
        let _gate = self.gate.lock();
        self.scan_locked(range)
    }

    fn replace_range(&self, range: &KeyRange, entries: RangeEntries) -> Result<(), LockError> {
        let _gate = self.gate.lock();
        let cf = self.cf_locks()?;

        let mut batch = WriteBatch::default();
        for (key, _) in self.scan_locked(range)? {
            batch.delete_cf(cf, &key);
        }
        for (key, value) in entries {
            batch.put_cf(cf, &key, &value);
        }
        self.db.write(batch)?;
        Ok(())
    }
}
