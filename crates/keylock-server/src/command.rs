//! Command execution for the keylock binary
//!
//! Each command builds a request, validates it, runs it against the lock core and renders
//! the response as pretty JSON. The wall clock is read here, never inside the core.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use keylock_common::KeylockError;
use keylock_consistency::{
    AcquireLockRequest, DeleteLockRequest, GetLockRequest, LockCommand, LockCommandResponse,
    LockId, LockStore, LocksCore, ReleaseLockRequest, RocksLockStore, Timestamp,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::model::config::{AcquireArgs, LockArgs, ReleaseArgs};
use crate::model::{Command, Configuration};

const NANOS_PER_MILLI: i64 = 1_000_000;

/// Result of `snapshot` and `restore`
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Current wall clock in nanoseconds since the Unix epoch
pub fn wall_clock_nanos() -> Result<Timestamp, KeylockError> {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .ok_or_else(|| KeylockError::InternalError("wall clock out of range".to_string()))
}

/// Open the store under the configured data directory and run `command` against it
pub fn run(command: &Command, configuration: &Configuration) -> anyhow::Result<String> {
    let data_dir = configuration.data_dir();
    std::fs::create_dir_all(&data_dir)
        .map_err(|e| KeylockError::StorageError(format!("cannot create {}: {}", data_dir, e)))?;

    let store = RocksLockStore::open(&data_dir).map_err(KeylockError::from)?;
    let core = LocksCore::standalone(Arc::new(store));

    let output = execute(
        &core,
        command,
        configuration.default_lease_ms()?,
        wall_clock_nanos,
    )?;
    Ok(output)
}

/// Run `command` against `core`; `clock` supplies `now` when the command does not
pub fn execute<S, C>(
    core: &LocksCore<S>,
    command: &Command,
    default_lease_ms: u64,
    clock: C,
) -> Result<String, KeylockError>
where
    S: LockStore,
    C: Fn() -> Result<Timestamp, KeylockError>,
{
    match command {
        Command::Acquire(args) => {
            let request = acquire_request(args, default_lease_ms, &clock)?;
            apply(core, &LockCommand::AcquireLock(request))
        }
        Command::Release(args) => {
            let request = release_request(args, &clock)?;
            apply(core, &LockCommand::ReleaseLock(request))
        }
        Command::Get(args) => {
            let request = GetLockRequest {
                lock_id: lock_id(args),
                now: now(args, &clock)?,
            };
            apply(core, &LockCommand::GetLock(request))
        }
        Command::Delete(args) => {
            let request = DeleteLockRequest {
                lock_id: lock_id(args),
                now: now(args, &clock)?,
            };
            apply(core, &LockCommand::DeleteLock(request))
        }
        Command::Snapshot { output } => {
            let data = core.snapshot().map_err(KeylockError::from)?;
            std::fs::write(output, &data).map_err(|e| io_error("write", output, e))?;
            info!("Snapshot written to {}", output.display());
            render(&SnapshotSummary {
                path: output.clone(),
                bytes: data.len(),
            })
        }
        Command::Restore { input } => {
            let data = std::fs::read(input).map_err(|e| io_error("read", input, e))?;
            core.restore(&data).map_err(KeylockError::from)?;
            render(&SnapshotSummary {
                path: input.clone(),
                bytes: data.len(),
            })
        }
    }
}

fn lock_id(args: &LockArgs) -> LockId {
    LockId::new(args.account, args.namespace.as_str(), args.lock.as_str())
}

fn now<C>(args: &LockArgs, clock: &C) -> Result<Timestamp, KeylockError>
where
    C: Fn() -> Result<Timestamp, KeylockError>,
{
    match args.now {
        Some(now) => Ok(now),
        None => clock(),
    }
}

fn acquire_request<C>(
    args: &AcquireArgs,
    default_lease_ms: u64,
    clock: &C,
) -> Result<AcquireLockRequest, KeylockError>
where
    C: Fn() -> Result<Timestamp, KeylockError>,
{
    let now = now(&args.lock, clock)?;
    let expires_at = match args.expires_at {
        Some(expires_at) => expires_at,
        None => {
            let lease_ms = args.lease_ms.unwrap_or(default_lease_ms);
            let lease_ns = i64::try_from(lease_ms)
                .ok()
                .and_then(|ms| ms.checked_mul(NANOS_PER_MILLI))
                .ok_or_else(|| {
                    KeylockError::IllegalArgument(format!("lease of {} ms is too long", lease_ms))
                })?;
            now.saturating_add(lease_ns)
        }
    };

    Ok(AcquireLockRequest {
        lock_id: lock_id(&args.lock),
        now,
        process_id: args.process.clone(),
        expires_at,
        write_lock: args.write,
    })
}

fn release_request<C>(args: &ReleaseArgs, clock: &C) -> Result<ReleaseLockRequest, KeylockError>
where
    C: Fn() -> Result<Timestamp, KeylockError>,
{
    Ok(ReleaseLockRequest {
        lock_id: lock_id(&args.lock),
        process_id: args.process.clone(),
        now: now(&args.lock, clock)?,
    })
}

/// Validate `command`, apply it to `core` and render the bare response
fn apply<S: LockStore>(
    core: &LocksCore<S>,
    command: &LockCommand,
) -> Result<String, KeylockError> {
    if let Err(e) = command.validate() {
        warn!("Rejected {} on lock {}: {}", command.name(), command.lock_id(), e);
        return Err(e);
    }

    match core.apply(command).map_err(KeylockError::from)? {
        LockCommandResponse::AcquireLock(response) => render(&response),
        LockCommandResponse::ReleaseLock(response) => render(&response),
        LockCommandResponse::GetLock(response) => render(&response),
        LockCommandResponse::DeleteLock(response) => render(&response),
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, KeylockError> {
    serde_json::to_string_pretty(value).map_err(|e| KeylockError::InternalError(e.to_string()))
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> KeylockError {
    KeylockError::StorageError(format!("failed to {} {}: {}", action, path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keylock_consistency::MemoryLockStore;

    const T0: Timestamp = 1_700_000_000_000_000_000;

    fn lock_args(now: Option<Timestamp>) -> LockArgs {
        LockArgs {
            account: 1,
            namespace: "ns".to_string(),
            lock: "lock".to_string(),
            now,
        }
    }

    fn fixed_clock() -> Result<Timestamp, KeylockError> {
        Ok(T0)
    }

    #[test]
    fn test_acquire_defaults_now_and_lease() {
        let args = AcquireArgs {
            lock: lock_args(None),
            process: "p1".to_string(),
            write: true,
            lease_ms: None,
            expires_at: None,
        };
        let request = acquire_request(&args, 30_000, &fixed_clock).unwrap();
        assert_eq!(request.now, T0);
        assert_eq!(request.expires_at, T0 + 30_000 * NANOS_PER_MILLI);
        assert!(request.write_lock);
    }

    #[test]
    fn test_explicit_expiry_wins_over_lease() {
        let args = AcquireArgs {
            lock: lock_args(Some(100)),
            process: "p1".to_string(),
            write: false,
            lease_ms: Some(5),
            expires_at: Some(200),
        };
        let request = acquire_request(&args, 30_000, &fixed_clock).unwrap();
        assert_eq!(request.now, 100);
        assert_eq!(request.expires_at, 200);
    }

    #[test]
    fn test_oversized_lease_is_rejected() {
        let args = AcquireArgs {
            lock: lock_args(Some(0)),
            process: "p1".to_string(),
            write: false,
            lease_ms: Some(u64::MAX),
            expires_at: None,
        };
        let err = acquire_request(&args, 30_000, &fixed_clock).unwrap_err();
        assert!(matches!(err, KeylockError::IllegalArgument(_)));
    }

    #[test]
    fn test_conflict_is_a_result_not_an_error() {
        let core = LocksCore::standalone(Arc::new(MemoryLockStore::new()));
        let acquire = |process: &str| {
            Command::Acquire(AcquireArgs {
                lock: lock_args(Some(T0)),
                process: process.to_string(),
                write: true,
                lease_ms: None,
                expires_at: None,
            })
        };

        let output = execute(&core, &acquire("p1"), 30_000, fixed_clock).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["lock"]["state"], "WRITE_LOCKED");

        let output = execute(&core, &acquire("p2"), 30_000, fixed_clock).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["lock"]["write_lock_holder"]["process_id"], "p1");
    }

    #[test]
    fn test_invalid_request_is_rejected_before_the_core() {
        let core = LocksCore::standalone(Arc::new(MemoryLockStore::new()));
        let command = Command::Acquire(AcquireArgs {
            lock: lock_args(Some(T0)),
            process: "p1".to_string(),
            write: true,
            lease_ms: None,
            expires_at: Some(T0 - 1),
        });

        let err = execute(&core, &command, 30_000, fixed_clock).unwrap_err();
        assert!(matches!(err, KeylockError::IllegalArgument(_)));
        assert!(core.store().is_empty());
    }

    #[test]
    fn test_responses_are_rendered_without_command_envelope() {
        let core = LocksCore::standalone(Arc::new(MemoryLockStore::new()));
        let get = Command::Get(lock_args(Some(T0)));
        let output = execute(&core, &get, 30_000, fixed_clock).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["lock"]["state"], "UNLOCKED");
        assert!(value.get("GetLock").is_none());

        let delete = Command::Delete(lock_args(Some(T0)));
        let output = execute(&core, &delete, 30_000, fixed_clock).unwrap();
        assert_eq!(output, "{}");
    }
}
