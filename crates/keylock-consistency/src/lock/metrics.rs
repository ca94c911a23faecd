// Lock operation counters
// Emitted through the `metrics` facade; the hosting process installs a recorder

use metrics::counter;

pub const LOCK_ACQUIRE_TOTAL: &str = "keylock_lock_acquire_total";
pub const LOCK_RELEASE_TOTAL: &str = "keylock_lock_release_total";
pub const LOCK_DELETE_TOTAL: &str = "keylock_lock_delete_total";
pub const LOCK_EVICTED_TOTAL: &str = "keylock_lock_evicted_total";

/// Record an acquire attempt, labelled by its outcome
pub fn record_acquire(success: bool) {
    let result = if success { "success" } else { "conflict" };
    counter!(LOCK_ACQUIRE_TOTAL, "result" => result).increment(1);
}

pub fn record_release() {
    counter!(LOCK_RELEASE_TOTAL).increment(1);
}

pub fn record_delete() {
    counter!(LOCK_DELETE_TOTAL).increment(1);
}

/// Record holders dropped because their lease ran out
pub fn record_evicted(holders: usize) {
    if holders > 0 {
        counter!(LOCK_EVICTED_TOTAL).increment(holders as u64);
    }
}
