//! Keylock Consistency - lease-based read/write lock core
//!
//! This crate provides:
//! - Lock model, expiration policy and state machine
//! - Lock table over a transactional key-value store (RocksDB or in-memory)
//! - Replicated command apply for the hosting log
//! - Shard snapshot and restore

#![allow(clippy::result_large_err)]

pub mod error;
pub mod lock;
pub mod store;

pub use error::LockError;

// Re-export lock types
pub use lock::{
    AcquireLockRequest, AcquireLockResponse, DeleteLockRequest, DeleteLockResponse,
    GetLockRequest, GetLockResponse, Lock, LockCommand, LockCommandResponse, LockHolder, LockId,
    LockState, LockStatus, LocksCore, ReleaseLockRequest, ReleaseLockResponse, Timestamp,
};

// Re-export stores
pub use store::{LockStore, LockTxn, MemoryLockStore, RocksLockStore, ShardBounds};
