//! Lock core of one shard
//!
//! Every operation runs as a single read-modify-write transaction against the
//! [`LockStore`]: load the record (or synthesize an unlocked one), apply the expiration
//! policy with the caller's `now`, run the transition and persist the result. Unlocked
//! results are persisted as an absent record. Nothing is written when the record did not
//! change. Any error drops the transaction, so no partial state is ever committed.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::LockError;
use crate::store::{
    KeyRange, LockStore, LockTxn, LocksSnapshot, LocksTable, ShardBounds, locks_table_range,
};

use super::expiration::{check_expiration, evicted_holders};
use super::metrics;
use super::model::{Lock, LockId, Timestamp};
use super::request::{
    AcquireLockRequest, AcquireLockResponse, DeleteLockRequest, DeleteLockResponse,
    GetLockRequest, GetLockResponse, LockCommand, LockCommandResponse, ReleaseLockRequest,
    ReleaseLockResponse,
};
use super::state_machine::{self, AcquireParams};

/// A record as loaded from the table, before and after expiration
struct Loaded {
    stored: Option<Lock>,
    lock: Lock,
    evicted: usize,
}

fn load<T: LockTxn>(
    table: &LocksTable<'_, T>,
    id: &LockId,
    now: Timestamp,
) -> Result<Loaded, LockError> {
    let stored = table.get(id)?;
    let current = stored
        .clone()
        .unwrap_or_else(|| Lock::unlocked(id.clone()));
    let lock = check_expiration(current, now);
    let evicted = stored
        .as_ref()
        .map_or(0, |before| evicted_holders(before, &lock));
    Ok(Loaded {
        stored,
        lock,
        evicted,
    })
}

/// Stage `lock` when it differs from what is stored; returns whether anything was staged
fn persist<T: LockTxn>(
    table: &mut LocksTable<'_, T>,
    stored: Option<&Lock>,
    lock: &Lock,
) -> Result<bool, LockError> {
    let unchanged = match stored {
        None => lock.is_unlocked(),
        Some(stored) => stored == lock,
    };
    if unchanged {
        return Ok(false);
    }
    table.set(lock)?;
    Ok(true)
}

fn observe<R>(
    operation: &str,
    lock_id: &LockId,
    result: Result<R, LockError>,
) -> Result<R, LockError> {
    if let Err(e) = &result {
        if e.is_fatal() {
            error!("{} on lock {} hit a fatal fault: {}", operation, lock_id, e);
        } else {
            warn!("{} on lock {} failed: {}", operation, lock_id, e);
        }
    }
    result
}

/// Read/write lease lock core over one shard of a [`LockStore`]
pub struct LocksCore<S: LockStore> {
    store: Arc<S>,
    bounds: ShardBounds,
    range: KeyRange,
}

impl<S: LockStore> LocksCore<S> {
    pub fn new(store: Arc<S>, bounds: ShardBounds) -> Self {
        let range = locks_table_range(&bounds);
        Self {
            store,
            bounds,
            range,
        }
    }

    /// Core owning every shard of `store`
    pub fn standalone(store: Arc<S>) -> Self {
        Self::new(store, ShardBounds::full())
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn bounds(&self) -> ShardBounds {
        self.bounds
    }

    /// Current state of a lock. Expired holders found on the way are evicted and the pruned
    /// record is persisted.
    pub fn get_lock(&self, request: &GetLockRequest) -> Result<GetLockResponse, LockError> {
        let result = self.try_get(request);
        observe("GetLock", &request.lock_id, result)
    }

    /// Try to take a read or write lease. A conflict is `success == false`, never an error.
    pub fn acquire_lock(
        &self,
        request: &AcquireLockRequest,
    ) -> Result<AcquireLockResponse, LockError> {
        let result = self.try_acquire(request);
        if let Ok(response) = &result {
            metrics::record_acquire(response.success);
        }
        observe("AcquireLock", &request.lock_id, result)
    }

    /// Drop the lease `request.process_id` holds; releasing a lease it does not hold is a no-op
    pub fn release_lock(
        &self,
        request: &ReleaseLockRequest,
    ) -> Result<ReleaseLockResponse, LockError> {
        let result = self.try_release(request);
        if result.is_ok() {
            metrics::record_release();
        }
        observe("ReleaseLock", &request.lock_id, result)
    }

    /// Remove the record whatever its holders; deleting an absent lock succeeds
    pub fn delete_lock(
        &self,
        request: &DeleteLockRequest,
    ) -> Result<DeleteLockResponse, LockError> {
        let result = self.try_delete(request);
        if result.is_ok() {
            metrics::record_delete();
        }
        observe("DeleteLock", &request.lock_id, result)
    }

    /// Apply one command from the replicated log
    pub fn apply(&self, command: &LockCommand) -> Result<LockCommandResponse, LockError> {
        debug!("Applying {} on lock {}", command.name(), command.lock_id());
        let response = match command {
            LockCommand::AcquireLock(r) => LockCommandResponse::AcquireLock(self.acquire_lock(r)?),
            LockCommand::ReleaseLock(r) => LockCommandResponse::ReleaseLock(self.release_lock(r)?),
            LockCommand::GetLock(r) => LockCommandResponse::GetLock(self.get_lock(r)?),
            LockCommand::DeleteLock(r) => LockCommandResponse::DeleteLock(self.delete_lock(r)?),
        };
        Ok(response)
    }

    /// Decode a serialized [`LockCommand`], apply it and encode the response
    pub fn apply_bytes(&self, command: &[u8]) -> Result<Vec<u8>, LockError> {
        let command: LockCommand = serde_json::from_slice(command)?;
        let response = self.apply(&command)?;
        Ok(serde_json::to_vec(&response)?)
    }

    /// Serialize every lock record of this shard
    pub fn snapshot(&self) -> Result<Vec<u8>, LockError> {
        let entries = self.store.scan_range(&self.range)?;
        let snapshot = LocksSnapshot::new(entries);
        let data = snapshot.encode()?;
        info!(
            "Built locks snapshot with {} records ({} bytes)",
            snapshot.entries.len(),
            data.len()
        );
        Ok(data)
    }

    /// Replace every lock record of this shard with the content of `data`
    pub fn restore(&self, data: &[u8]) -> Result<(), LockError> {
        let snapshot = LocksSnapshot::decode(data)?;
        snapshot.validate(&self.range)?;
        let records = snapshot.entries.len();
        self.store.replace_range(&self.range, snapshot.entries)?;
        info!("Locks snapshot installed: {} records", records);
        Ok(())
    }

    fn try_get(&self, request: &GetLockRequest) -> Result<GetLockResponse, LockError> {
        let mut txn = self.store.begin()?;
        let mut table = LocksTable::new(&mut txn);

        let loaded = load(&table, &request.lock_id, request.now)?;
        if persist(&mut table, loaded.stored.as_ref(), &loaded.lock)? {
            txn.commit()?;
            debug!(
                "Lock {} pruned to {} at {}",
                request.lock_id,
                loaded.lock.state(),
                request.now
            );
        }
        metrics::record_evicted(loaded.evicted);

        Ok(GetLockResponse { lock: loaded.lock })
    }

    fn try_acquire(&self, request: &AcquireLockRequest) -> Result<AcquireLockResponse, LockError> {
        let mut txn = self.store.begin()?;
        let mut table = LocksTable::new(&mut txn);

        let loaded = load(&table, &request.lock_id, request.now)?;
        let params = AcquireParams {
            process_id: &request.process_id,
            expires_at: request.expires_at,
            now: request.now,
            write_lock: request.write_lock,
        };
        let outcome = state_machine::acquire(loaded.lock, &params);

        // a conflict still persists the pruned record
        if persist(&mut table, loaded.stored.as_ref(), &outcome.lock)? {
            txn.commit()?;
        }
        metrics::record_evicted(loaded.evicted);

        debug!(
            "Acquire {} lock {} by {}: success={}, state={}",
            if request.write_lock { "write" } else { "read" },
            request.lock_id,
            request.process_id,
            outcome.success,
            outcome.lock.state()
        );

        Ok(AcquireLockResponse {
            lock: outcome.lock,
            success: outcome.success,
        })
    }

    fn try_release(&self, request: &ReleaseLockRequest) -> Result<ReleaseLockResponse, LockError> {
        let mut txn = self.store.begin()?;
        let mut table = LocksTable::new(&mut txn);

        let loaded = load(&table, &request.lock_id, request.now)?;
        let lock = state_machine::release(loaded.lock, &request.process_id);

        if persist(&mut table, loaded.stored.as_ref(), &lock)? {
            txn.commit()?;
        }
        metrics::record_evicted(loaded.evicted);

        debug!(
            "Release lock {} by {}: state={}",
            request.lock_id,
            request.process_id,
            lock.state()
        );

        Ok(ReleaseLockResponse { lock })
    }

    fn try_delete(&self, request: &DeleteLockRequest) -> Result<DeleteLockResponse, LockError> {
        let mut txn = self.store.begin()?;
        let mut table = LocksTable::new(&mut txn);

        if table.contains(&request.lock_id)? {
            table.delete(&request.lock_id)?;
            txn.commit()?;
            debug!("Lock {} deleted", request.lock_id);
        }

        Ok(DeleteLockResponse::default())
    }
}
