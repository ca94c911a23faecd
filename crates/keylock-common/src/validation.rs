//! Input validation rules for lock requests
//!
//! Requests are checked before they reach the lock core. The core itself accepts any
//! identifier; these limits keep keys bounded and reject obviously malformed input.

use validator::ValidationError;

use crate::KeylockError;

/// Maximum length for namespace_name field
pub const MAX_NAMESPACE_NAME_LENGTH: usize = 128;

/// Maximum length for lock_name field
pub const MAX_LOCK_NAME_LENGTH: usize = 128;

/// Maximum length for process_id field
pub const MAX_PROCESS_ID_LENGTH: usize = 128;

/// Validate namespace name
pub fn validate_namespace_name(namespace_name: &str) -> Result<(), ValidationError> {
    if namespace_name.is_empty() {
        return Err(ValidationError::new("namespace_name_empty"));
    }
    if namespace_name.len() > MAX_NAMESPACE_NAME_LENGTH {
        return Err(ValidationError::new("namespace_name_too_long"));
    }
    Ok(())
}

/// Validate lock name
pub fn validate_lock_name(lock_name: &str) -> Result<(), ValidationError> {
    if lock_name.is_empty() {
        return Err(ValidationError::new("lock_name_empty"));
    }
    if lock_name.len() > MAX_LOCK_NAME_LENGTH {
        return Err(ValidationError::new("lock_name_too_long"));
    }
    Ok(())
}

/// Validate process id
pub fn validate_process_id(process_id: &str) -> Result<(), ValidationError> {
    if process_id.is_empty() {
        return Err(ValidationError::new("process_id_empty"));
    }
    if process_id.len() > MAX_PROCESS_ID_LENGTH {
        return Err(ValidationError::new("process_id_too_long"));
    }
    Ok(())
}

/// Validate a lease window: a lease may not end before it starts
pub fn validate_lease(now: i64, expires_at: i64) -> Result<(), ValidationError> {
    if expires_at < now {
        return Err(ValidationError::new("expires_at_before_now"));
    }
    Ok(())
}

/// Convert a validation failure into an `IllegalArgument` naming the request field
pub fn to_illegal_argument(request: &str, field: &str, err: ValidationError) -> KeylockError {
    KeylockError::IllegalArgument(format!("invalid {}.{} ({})", request, field, err.code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_namespace_name() {
        assert!(validate_namespace_name("test_namespace").is_ok());
        assert!(validate_namespace_name("").is_err());
        assert!(validate_namespace_name(&"n".repeat(MAX_NAMESPACE_NAME_LENGTH)).is_ok());
        assert!(validate_namespace_name(&"n".repeat(MAX_NAMESPACE_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_lock_name() {
        assert!(validate_lock_name("test_lock").is_ok());
        assert_eq!(
            validate_lock_name("").unwrap_err().code,
            "lock_name_empty"
        );
        assert_eq!(
            validate_lock_name(&"l".repeat(MAX_LOCK_NAME_LENGTH + 1))
                .unwrap_err()
                .code,
            "lock_name_too_long"
        );
    }

    #[test]
    fn test_validate_process_id() {
        assert!(validate_process_id("process_1").is_ok());
        assert!(validate_process_id("").is_err());
        assert!(validate_process_id(&"p".repeat(MAX_PROCESS_ID_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_lease() {
        assert!(validate_lease(100, 200).is_ok());
        assert!(validate_lease(100, 100).is_ok());
        assert!(validate_lease(100, 99).is_err());
    }

    #[test]
    fn test_to_illegal_argument_message() {
        let err = validate_lock_name("").unwrap_err();
        let err = to_illegal_argument("AcquireLockRequest", "lock_name", err);
        assert_eq!(
            err.to_string(),
            "caused: invalid AcquireLockRequest.lock_name (lock_name_empty)"
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn names_within_limit_are_accepted(name in "[a-zA-Z0-9_.:-]{1,128}") {
                prop_assert!(validate_namespace_name(&name).is_ok());
                prop_assert!(validate_lock_name(&name).is_ok());
                prop_assert!(validate_process_id(&name).is_ok());
            }
        }
    }
}
