//! Lease expiration policy
//!
//! Applied to every loaded record before any transition. Readers survive while
//! `expires_at >= now`; a writer is gone once `expires_at <= now`. Replicas replaying the
//! same log must evaluate the same boundaries, so neither comparison may change.

use super::model::{Lock, LockHolder, LockStatus, Timestamp};

/// Whether a read holder is still valid at `now`
#[inline]
pub fn is_read_holder_alive(holder: &LockHolder, now: Timestamp) -> bool {
    holder.expires_at >= now
}

/// Whether the write holder has expired at `now`
#[inline]
pub fn is_write_holder_expired(holder: &LockHolder, now: Timestamp) -> bool {
    holder.expires_at <= now
}

/// Drop every holder whose lease ended before `now`, unlocking the record when none remain.
pub fn check_expiration(lock: Lock, now: Timestamp) -> Lock {
    let status = match lock.status {
        LockStatus::Unlocked => LockStatus::Unlocked,
        LockStatus::ReadLocked { locked_at, holders } => {
            let holders: Vec<LockHolder> = holders
                .into_iter()
                .filter(|h| is_read_holder_alive(h, now))
                .collect();
            if holders.is_empty() {
                LockStatus::Unlocked
            } else {
                LockStatus::ReadLocked { locked_at, holders }
            }
        }
        LockStatus::WriteLocked { locked_at, holder } => {
            if is_write_holder_expired(&holder, now) {
                LockStatus::Unlocked
            } else {
                LockStatus::WriteLocked { locked_at, holder }
            }
        }
    };

    Lock {
        id: lock.id,
        status,
    }
}

/// Number of holders `check_expiration` removed between `before` and `after`
pub fn evicted_holders(before: &Lock, after: &Lock) -> usize {
    let count = |lock: &Lock| {
        lock.read_lock_holders().len() + usize::from(lock.write_lock_holder().is_some())
    };
    count(before).saturating_sub(count(after))
}
