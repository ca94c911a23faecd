// Metrics registration for the keylock binary
// The lock core emits the counters; this only attaches their descriptions

use keylock_consistency::lock::metrics::{
    LOCK_ACQUIRE_TOTAL, LOCK_DELETE_TOTAL, LOCK_EVICTED_TOTAL, LOCK_RELEASE_TOTAL,
};
use metrics::describe_counter;

/// Initialize all metric descriptions
/// Should be called once at startup
pub fn init_metrics() {
    describe_counter!(
        LOCK_ACQUIRE_TOTAL,
        "Total number of lock acquire attempts, labelled by result"
    );
    describe_counter!(LOCK_RELEASE_TOTAL, "Total number of lock releases");
    describe_counter!(LOCK_DELETE_TOTAL, "Total number of lock deletions");
    describe_counter!(
        LOCK_EVICTED_TOTAL,
        "Total number of lock holders evicted after their lease expired"
    );

    tracing::debug!("Metrics initialized");
}
