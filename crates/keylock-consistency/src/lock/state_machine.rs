//! Lock state transitions
//!
//! Pure functions over an already expiration-checked [`Lock`]. They never read a clock,
//! never touch storage and return a fresh value instead of mutating the stored record.
//!
//! | Current      | Request                  | Result                               |
//! |--------------|--------------------------|--------------------------------------|
//! | UNLOCKED     | write                    | WRITE_LOCKED, success                |
//! | UNLOCKED     | read                     | READ_LOCKED, success                 |
//! | READ_LOCKED  | write                    | unchanged, failure                   |
//! | READ_LOCKED  | read (holder)            | holder lease renewed, success        |
//! | READ_LOCKED  | read (new process)       | holder appended, success             |
//! | WRITE_LOCKED | write (holder)           | holder lease renewed, success        |
//! | WRITE_LOCKED | write (other process)    | unchanged, failure                   |
//! | WRITE_LOCKED | read                     | unchanged, failure                   |

use super::model::{Lock, LockHolder, LockStatus, Timestamp};

/// Inputs of an acquire transition
#[derive(Debug, Clone, Copy)]
pub struct AcquireParams<'a> {
    pub process_id: &'a str,
    pub expires_at: Timestamp,
    pub now: Timestamp,
    pub write_lock: bool,
}

/// Result of an acquire transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireOutcome {
    /// The lock after the transition; on failure, the lock as it stands
    pub lock: Lock,
    pub success: bool,
}

/// Compute the lock after `params.process_id` asks for it.
///
/// A conflict is a normal outcome (`success == false`) carrying the current holders.
/// Record-level `locked_at` only changes when leaving the unlocked state.
pub fn acquire(lock: Lock, params: &AcquireParams<'_>) -> AcquireOutcome {
    let holder = LockHolder::new(params.process_id, params.now, params.expires_at);
    let id = lock.id;

    let (status, success) = match lock.status {
        LockStatus::Unlocked => {
            let status = if params.write_lock {
                LockStatus::WriteLocked {
                    locked_at: params.now,
                    holder,
                }
            } else {
                LockStatus::ReadLocked {
                    locked_at: params.now,
                    holders: vec![holder],
                }
            };
            (status, true)
        }
        LockStatus::ReadLocked { locked_at, holders } if params.write_lock => {
            // reads block writes
            (LockStatus::ReadLocked { locked_at, holders }, false)
        }
        LockStatus::ReadLocked {
            locked_at,
            mut holders,
        } => {
            match holders
                .iter_mut()
                .find(|h| h.process_id == params.process_id)
            {
                Some(existing) => {
                    existing.locked_at = params.now;
                    existing.expires_at = params.expires_at;
                }
                None => holders.push(holder),
            }
            (LockStatus::ReadLocked { locked_at, holders }, true)
        }
        LockStatus::WriteLocked {
            locked_at,
            holder: current,
        } => {
            if params.write_lock && current.process_id == params.process_id {
                (LockStatus::WriteLocked { locked_at, holder }, true)
            } else {
                (
                    LockStatus::WriteLocked {
                        locked_at,
                        holder: current,
                    },
                    false,
                )
            }
        }
    };

    AcquireOutcome {
        lock: Lock { id, status },
        success,
    }
}

/// Compute the lock after `process_id` lets go of it.
///
/// Releasing a lock the process does not hold leaves the lock untouched.
pub fn release(lock: Lock, process_id: &str) -> Lock {
    let status = match lock.status {
        LockStatus::Unlocked => LockStatus::Unlocked,
        LockStatus::ReadLocked {
            locked_at,
            mut holders,
        } => {
            holders.retain(|h| h.process_id != process_id);
            if holders.is_empty() {
                LockStatus::Unlocked
            } else {
                LockStatus::ReadLocked { locked_at, holders }
            }
        }
        LockStatus::WriteLocked { holder, .. } if holder.process_id == process_id => {
            LockStatus::Unlocked
        }
        status @ LockStatus::WriteLocked { .. } => status,
    };

    Lock {
        id: lock.id,
        status,
    }
}
