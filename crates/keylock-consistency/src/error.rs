//! Lock core error types

use keylock_common::KeylockError;

/// Failures of a lock operation.
///
/// A lock conflict is not an error: it is an `AcquireLockResponse` with `success == false`.
#[derive(thiserror::Error, Debug)]
pub enum LockError {
    /// The transactional store failed to read, write or commit
    #[error("storage failure: {0}")]
    Storage(String),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted record is unreadable or breaks the lock invariants
    #[error("corrupted lock record at key {key}: {reason}")]
    CorruptedRecord { key: String, reason: String },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// The lock id cannot be encoded as a storage key
    #[error("invalid lock id: {0}")]
    InvalidLockId(String),
}

impl LockError {
    /// Fatal faults mean corrupted data or a logic bug; callers must not retry them
    pub fn is_fatal(&self) -> bool {
        matches!(self, LockError::CorruptedRecord { .. })
    }
}

impl From<rocksdb::Error> for LockError {
    fn from(e: rocksdb::Error) -> Self {
        LockError::Storage(e.to_string())
    }
}

impl From<LockError> for KeylockError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::Storage(msg) => KeylockError::StorageError(msg),
            LockError::Serialization(e) => KeylockError::InternalError(e.to_string()),
            e @ LockError::CorruptedRecord { .. } => KeylockError::InternalError(e.to_string()),
            LockError::InvalidSnapshot(msg) | LockError::InvalidLockId(msg) => {
                KeylockError::IllegalArgument(msg)
            }
        }
    }
}
