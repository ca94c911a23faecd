//! Keylock Common - Shared types and utilities
//!
//! This crate provides the foundational types used across all keylock components:
//! - Error types and error codes
//! - Request validation rules
//! - Common constants

pub mod error;
pub mod validation;

// Re-exports for convenience
pub use error::{AppError, ErrorCode, KeylockError};
pub use validation::{
    MAX_LOCK_NAME_LENGTH, MAX_NAMESPACE_NAME_LENGTH, MAX_PROCESS_ID_LENGTH, to_illegal_argument,
    validate_lease, validate_lock_name, validate_namespace_name, validate_process_id,
};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "KEYLOCK";

/// Default lease length applied when a client does not pass an explicit expiry
pub const DEFAULT_LEASE_MS: u64 = 30_000;
