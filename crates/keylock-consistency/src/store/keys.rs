//! Key layout of the locks table
//!
//! ```text
//! table id (2) | shard key (4) | account id (u64 BE) | ns len (u32 BE) | namespace | lock name
//! ```
//!
//! The shard key prefix lets the partitioning layer co-locate all locks of one namespace.
//! The namespace is length-prefixed so that distinct (namespace, lock) pairs never encode
//! to the same bytes.

use byteorder::{BigEndian, ByteOrder};
use md5::{Digest, Md5};

use crate::error::LockError;
use crate::lock::LockId;

/// Table prefix of the locks table inside a shared store
pub const LOCKS_TABLE_ID: [u8; 2] = [0x01, 0x00];

/// Length of the shard key prefix
pub const SHARD_KEY_LEN: usize = 4;

/// Shard key for all locks of one namespace of one account
pub fn shard_by_account_and_namespace(
    account_id: u64,
    namespace_name: &str,
) -> [u8; SHARD_KEY_LEN] {
    let mut account = [0u8; 8];
    BigEndian::write_u64(&mut account, account_id);

    let mut hasher = Md5::new();
    hasher.update(account);
    hasher.update(namespace_name.as_bytes());
    let digest = hasher.finalize();

    let mut shard_key = [0u8; SHARD_KEY_LEN];
    shard_key.copy_from_slice(&digest.as_slice()[..SHARD_KEY_LEN]);
    shard_key
}

/// Length prefix of a namespace; namespaces longer than `u32::MAX` bytes have no key
fn namespace_len_prefix(len: usize) -> Result<[u8; 4], LockError> {
    let len = u32::try_from(len).map_err(|_| {
        LockError::InvalidLockId(format!("namespace of {} bytes is too long", len))
    })?;
    let mut prefix = [0u8; 4];
    BigEndian::write_u32(&mut prefix, len);
    Ok(prefix)
}

/// Storage key of a lock record
pub fn lock_key(id: &LockId) -> Result<Vec<u8>, LockError> {
    let namespace = id.namespace_name.as_bytes();
    let lock_name = id.lock_name.as_bytes();

    let mut key = Vec::with_capacity(
        LOCKS_TABLE_ID.len() + SHARD_KEY_LEN + 8 + 4 + namespace.len() + lock_name.len(),
    );
    key.extend_from_slice(&LOCKS_TABLE_ID);
    key.extend_from_slice(&shard_by_account_and_namespace(
        id.account_id,
        &id.namespace_name,
    ));

    let mut account = [0u8; 8];
    BigEndian::write_u64(&mut account, id.account_id);
    key.extend_from_slice(&account);

    key.extend_from_slice(&namespace_len_prefix(namespace.len())?);
    key.extend_from_slice(namespace);

    key.extend_from_slice(lock_name);
    Ok(key)
}

/// Inclusive range of shard keys owned by one shard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardBounds {
    pub lower: [u8; SHARD_KEY_LEN],
    pub upper: [u8; SHARD_KEY_LEN],
}

impl ShardBounds {
    pub fn new(lower: [u8; SHARD_KEY_LEN], upper: [u8; SHARD_KEY_LEN]) -> Self {
        Self { lower, upper }
    }

    /// Bounds of a node that owns every shard
    pub fn full() -> Self {
        Self {
            lower: [0x00; SHARD_KEY_LEN],
            upper: [0xff; SHARD_KEY_LEN],
        }
    }

    pub fn contains(&self, shard_key: &[u8; SHARD_KEY_LEN]) -> bool {
        self.lower <= *shard_key && *shard_key <= self.upper
    }
}

impl Default for ShardBounds {
    fn default() -> Self {
        Self::full()
    }
}

/// Half-open byte range `[start, end)`; `end == None` means unbounded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Vec<u8>,
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && self.end.as_deref().is_none_or(|end| key < end)
    }
}

/// Key range of the locks table restricted to `bounds`
pub fn locks_table_range(bounds: &ShardBounds) -> KeyRange {
    let mut start = LOCKS_TABLE_ID.to_vec();
    start.extend_from_slice(&bounds.lower);

    let mut upper_prefix = LOCKS_TABLE_ID.to_vec();
    upper_prefix.extend_from_slice(&bounds.upper);

    KeyRange {
        start,
        end: prefix_successor(&upper_prefix),
    }
}

/// Smallest key greater than every key starting with `prefix`
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_key_is_deterministic() {
        let a = shard_by_account_and_namespace(42, "test_namespace");
        let b = shard_by_account_and_namespace(42, "test_namespace");
        assert_eq!(a, b);
        assert_ne!(a, shard_by_account_and_namespace(43, "test_namespace"));
    }

    #[test]
    fn test_lock_key_layout() {
        let id = LockId::new(1, "ns", "lock");
        let key = lock_key(&id).unwrap();

        assert_eq!(&key[..2], &LOCKS_TABLE_ID);
        assert_eq!(&key[2..6], &shard_by_account_and_namespace(1, "ns"));
        assert_eq!(&key[6..14], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&key[14..18], &[0, 0, 0, 2]);
        assert_eq!(&key[18..20], b"ns");
        assert_eq!(&key[20..], b"lock");
    }

    #[test]
    fn test_namespace_length_prefix() {
        assert_eq!(namespace_len_prefix(2).unwrap(), [0, 0, 0, 2]);
        assert_eq!(
            namespace_len_prefix(u32::MAX as usize).unwrap(),
            [0xff, 0xff, 0xff, 0xff]
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_namespace_has_no_key() {
        let err = namespace_len_prefix(u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, LockError::InvalidLockId(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_namespace_and_lock_name_do_not_collide() {
        let a = lock_key(&LockId::new(1, "ab", "c")).unwrap();
        let b = lock_key(&LockId::new(1, "a", "bc")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_locks_of_one_namespace_share_prefix() {
        let a = lock_key(&LockId::new(9, "ns", "first")).unwrap();
        let b = lock_key(&LockId::new(9, "ns", "second")).unwrap();
        assert_eq!(&a[..20], &b[..20]);
    }

    #[test]
    fn test_full_range_contains_every_lock() {
        let range = locks_table_range(&ShardBounds::full());
        assert_eq!(range.start, vec![0x01, 0x00, 0, 0, 0, 0]);
        assert_eq!(range.end, Some(vec![0x01, 0x01]));

        for account in 0..50u64 {
            let key = lock_key(&LockId::new(account, "ns", "l")).unwrap();
            assert!(range.contains(&key));
        }
        assert!(!range.contains(&[0x02, 0x00]));
        assert!(!range.contains(&[0x00, 0xff]));
    }

    #[test]
    fn test_partial_bounds() {
        let bounds = ShardBounds::new([0x00, 0, 0, 0], [0x7f, 0xff, 0xff, 0xff]);
        let range = locks_table_range(&bounds);
        assert_eq!(range.end, Some(vec![0x01, 0x00, 0x80]));

        for account in 0..50u64 {
            let id = LockId::new(account, "ns", "l");
            let shard = shard_by_account_and_namespace(account, "ns");
            let key = lock_key(&id).unwrap();
            assert_eq!(bounds.contains(&shard), range.contains(&key));
        }
    }

    #[test]
    fn test_prefix_successor() {
        assert_eq!(prefix_successor(&[0x01, 0x00]), Some(vec![0x01, 0x01]));
        assert_eq!(prefix_successor(&[0x01, 0xff]), Some(vec![0x02]));
        assert_eq!(prefix_successor(&[0xff, 0xff]), None);
    }
}
