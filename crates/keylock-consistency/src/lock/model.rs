//! Lock data model
//!
//! The lock state and its holders live in one sum type, [`LockStatus`], so a write holder
//! and read holders can never coexist. On the wire and on disk a lock keeps the flat
//! shape `{id, state, locked_at, write_lock_holder, read_lock_holders}`; decoding checks
//! the remaining invariants (non-empty, duplicate-free reader set).

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical timestamp supplied by the caller. Every expiry comparison uses it, never a
/// node-local clock.
pub type Timestamp = i64;

/// Composite lock identifier: (account, namespace, lock name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockId {
    pub account_id: u64,
    pub namespace_name: String,
    pub lock_name: String,
}

impl LockId {
    pub fn new(
        account_id: u64,
        namespace_name: impl Into<String>,
        lock_name: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            namespace_name: namespace_name.into(),
            lock_name: lock_name.into(),
        }
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.account_id, self.namespace_name, self.lock_name
        )
    }
}

/// A process holding a lease on a lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    /// Reentrancy identity, unique within one lock's holder set
    pub process_id: String,
    pub locked_at: Timestamp,
    pub expires_at: Timestamp,
}

impl LockHolder {
    pub fn new(process_id: impl Into<String>, locked_at: Timestamp, expires_at: Timestamp) -> Self {
        Self {
            process_id: process_id.into(),
            locked_at,
            expires_at,
        }
    }
}

/// Lock state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockState {
    Unlocked,
    ReadLocked,
    WriteLocked,
}

impl LockState {
    pub fn as_str(self) -> &'static str {
        match self {
            LockState::Unlocked => "UNLOCKED",
            LockState::ReadLocked => "READ_LOCKED",
            LockState::WriteLocked => "WRITE_LOCKED",
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock state together with the holders that state requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    Unlocked,
    ReadLocked {
        locked_at: Timestamp,
        /// Insertion order is acquisition order
        holders: Vec<LockHolder>,
    },
    WriteLocked {
        locked_at: Timestamp,
        holder: LockHolder,
    },
}

/// A lock record. Absence of a stored record means [`LockStatus::Unlocked`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LockRecord", into = "LockRecord")]
pub struct Lock {
    pub id: LockId,
    pub status: LockStatus,
}

impl Lock {
    /// The implicit record used when nothing is stored for `id`
    pub fn unlocked(id: LockId) -> Self {
        Self {
            id,
            status: LockStatus::Unlocked,
        }
    }

    pub fn state(&self) -> LockState {
        match self.status {
            LockStatus::Unlocked => LockState::Unlocked,
            LockStatus::ReadLocked { .. } => LockState::ReadLocked,
            LockStatus::WriteLocked { .. } => LockState::WriteLocked,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self.status, LockStatus::Unlocked)
    }

    /// Time the lock left the unlocked state, 0 while unlocked
    pub fn locked_at(&self) -> Timestamp {
        match &self.status {
            LockStatus::Unlocked => 0,
            LockStatus::ReadLocked { locked_at, .. }
            | LockStatus::WriteLocked { locked_at, .. } => *locked_at,
        }
    }

    pub fn write_lock_holder(&self) -> Option<&LockHolder> {
        match &self.status {
            LockStatus::WriteLocked { holder, .. } => Some(holder),
            _ => None,
        }
    }

    pub fn read_lock_holders(&self) -> &[LockHolder] {
        match &self.status {
            LockStatus::ReadLocked { holders, .. } => holders,
            _ => &[],
        }
    }

    /// Check the invariants the type system does not cover
    pub fn check_invariants(&self) -> Result<(), String> {
        if let LockStatus::ReadLocked { holders, .. } = &self.status {
            if holders.is_empty() {
                return Err("READ_LOCKED lock without read holders".to_string());
            }
            let mut seen = HashSet::with_capacity(holders.len());
            for holder in holders {
                if !seen.insert(holder.process_id.as_str()) {
                    return Err(format!(
                        "duplicate read holder process_id '{}'",
                        holder.process_id
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Flat persisted shape of a lock
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockRecord {
    id: LockId,
    state: LockState,
    #[serde(default)]
    locked_at: Timestamp,
    #[serde(default)]
    write_lock_holder: Option<LockHolder>,
    #[serde(default)]
    read_lock_holders: Vec<LockHolder>,
}

impl From<Lock> for LockRecord {
    fn from(lock: Lock) -> Self {
        let state = lock.state();
        let (locked_at, write_lock_holder, read_lock_holders) = match lock.status {
            LockStatus::Unlocked => (0, None, Vec::new()),
            LockStatus::ReadLocked { locked_at, holders } => (locked_at, None, holders),
            LockStatus::WriteLocked { locked_at, holder } => (locked_at, Some(holder), Vec::new()),
        };
        Self {
            id: lock.id,
            state,
            locked_at,
            write_lock_holder,
            read_lock_holders,
        }
    }
}

impl TryFrom<LockRecord> for Lock {
    type Error = String;

    fn try_from(record: LockRecord) -> Result<Self, Self::Error> {
        let status = match record.state {
            LockState::Unlocked => {
                if record.write_lock_holder.is_some() || !record.read_lock_holders.is_empty() {
                    return Err("UNLOCKED lock with holders".to_string());
                }
                if record.locked_at != 0 {
                    return Err("UNLOCKED lock with non-zero locked_at".to_string());
                }
                LockStatus::Unlocked
            }
            LockState::ReadLocked => {
                if record.write_lock_holder.is_some() {
                    return Err("READ_LOCKED lock with a write holder".to_string());
                }
                LockStatus::ReadLocked {
                    locked_at: record.locked_at,
                    holders: record.read_lock_holders,
                }
            }
            LockState::WriteLocked => {
                if !record.read_lock_holders.is_empty() {
                    return Err("WRITE_LOCKED lock with read holders".to_string());
                }
                let holder = record
                    .write_lock_holder
                    .ok_or_else(|| "WRITE_LOCKED lock without a write holder".to_string())?;
                LockStatus::WriteLocked {
                    locked_at: record.locked_at,
                    holder,
                }
            }
        };

        let lock = Lock {
            id: record.id,
            status,
        };
        lock.check_invariants()?;
        Ok(lock)
    }
}
