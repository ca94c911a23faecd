//! Lock request and response types
//!
//! These are the shapes exchanged with the core and the commands the replication layer
//! feeds to [`LocksCore::apply`](super::service::LocksCore::apply).

use keylock_common::validation::{
    to_illegal_argument, validate_lease, validate_lock_name, validate_namespace_name,
    validate_process_id,
};
use keylock_common::KeylockError;
use serde::{Deserialize, Serialize};

use super::model::{Lock, LockId, Timestamp};

/// Acquire a read or write lease
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireLockRequest {
    pub lock_id: LockId,
    pub now: Timestamp,
    pub process_id: String,
    pub expires_at: Timestamp,
    #[serde(default)]
    pub write_lock: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireLockResponse {
    /// The lock after the call; on conflict it shows the current holders
    pub lock: Lock,
    pub success: bool,
}

/// Give up a lease held by `process_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseLockRequest {
    pub lock_id: LockId,
    pub process_id: String,
    pub now: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseLockResponse {
    pub lock: Lock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLockRequest {
    pub lock_id: LockId,
    pub now: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLockResponse {
    pub lock: Lock,
}

/// Remove a lock regardless of its holders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteLockRequest {
    pub lock_id: LockId,
    pub now: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteLockResponse {}

/// Command replicated through the shard log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockCommand {
    AcquireLock(AcquireLockRequest),
    ReleaseLock(ReleaseLockRequest),
    GetLock(GetLockRequest),
    DeleteLock(DeleteLockRequest),
}

impl LockCommand {
    pub fn lock_id(&self) -> &LockId {
        match self {
            LockCommand::AcquireLock(r) => &r.lock_id,
            LockCommand::ReleaseLock(r) => &r.lock_id,
            LockCommand::GetLock(r) => &r.lock_id,
            LockCommand::DeleteLock(r) => &r.lock_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LockCommand::AcquireLock(_) => "AcquireLock",
            LockCommand::ReleaseLock(_) => "ReleaseLock",
            LockCommand::GetLock(_) => "GetLock",
            LockCommand::DeleteLock(_) => "DeleteLock",
        }
    }
}

/// Response to a replicated [`LockCommand`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockCommandResponse {
    AcquireLock(AcquireLockResponse),
    ReleaseLock(ReleaseLockResponse),
    GetLock(GetLockResponse),
    DeleteLock(DeleteLockResponse),
}

fn validate_lock_id(request: &str, lock_id: &LockId) -> Result<(), KeylockError> {
    validate_namespace_name(&lock_id.namespace_name)
        .map_err(|e| to_illegal_argument(request, "namespace_name", e))?;
    validate_lock_name(&lock_id.lock_name)
        .map_err(|e| to_illegal_argument(request, "lock_name", e))?;
    Ok(())
}

impl AcquireLockRequest {
    pub fn validate(&self) -> Result<(), KeylockError> {
        validate_lock_id("AcquireLockRequest", &self.lock_id)?;
        validate_process_id(&self.process_id)
            .map_err(|e| to_illegal_argument("AcquireLockRequest", "process_id", e))?;
        validate_lease(self.now, self.expires_at)
            .map_err(|e| to_illegal_argument("AcquireLockRequest", "expires_at", e))?;
        Ok(())
    }
}

impl ReleaseLockRequest {
    pub fn validate(&self) -> Result<(), KeylockError> {
        validate_lock_id("ReleaseLockRequest", &self.lock_id)?;
        validate_process_id(&self.process_id)
            .map_err(|e| to_illegal_argument("ReleaseLockRequest", "process_id", e))?;
        Ok(())
    }
}

impl GetLockRequest {
    pub fn validate(&self) -> Result<(), KeylockError> {
        validate_lock_id("GetLockRequest", &self.lock_id)
    }
}

impl DeleteLockRequest {
    pub fn validate(&self) -> Result<(), KeylockError> {
        validate_lock_id("DeleteLockRequest", &self.lock_id)
    }
}

impl LockCommand {
    pub fn validate(&self) -> Result<(), KeylockError> {
        match self {
            LockCommand::AcquireLock(r) => r.validate(),
            LockCommand::ReleaseLock(r) => r.validate(),
            LockCommand::GetLock(r) => r.validate(),
            LockCommand::DeleteLock(r) => r.validate(),
        }
    }
}
