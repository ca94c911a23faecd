//! Error types and error codes for keylock
//!
//! This module defines:
//! - `KeylockError`: Application-specific error enum
//! - `AppError`: Wrapper used at the binary edge
//! - `ErrorCode`: Structured error codes for command output

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum KeylockError {
    #[error("caused: {0}")]
    IllegalArgument(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl KeylockError {
    /// Map the error onto the code reported to callers
    pub fn error_code(&self) -> ErrorCode<'static> {
        match self {
            KeylockError::IllegalArgument(_) => PARAMETER_VALIDATE_ERROR,
            KeylockError::StorageError(_) => DATA_ACCESS_ERROR,
            KeylockError::ConfigError(_) => CONFIG_ERROR,
            KeylockError::InternalError(_) => SERVER_ERROR,
        }
    }
}

/// Wrapper for application errors
#[derive(Debug)]
pub struct AppError {
    inner: anyhow::Error,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError { inner: value }
    }
}

impl AppError {
    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Error code for the wrapped error, `SERVER_ERROR` when it is not a `KeylockError`
    pub fn error_code(&self) -> ErrorCode<'static> {
        self.downcast_ref::<KeylockError>()
            .map(KeylockError::error_code)
            .unwrap_or(SERVER_ERROR)
    }
}

/// Error code structure for command responses
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const DATA_ACCESS_ERROR: ErrorCode<'static> = ErrorCode {
    code: 10002,
    message: "data access error",
};

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const CONFIG_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20014,
    message: "configuration error",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "server error",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keylock_error_display() {
        let err = KeylockError::IllegalArgument("invalid param".to_string());
        assert_eq!(format!("{}", err), "caused: invalid param");

        let err = KeylockError::StorageError("disk full".to_string());
        assert_eq!(format!("{}", err), "storage error: disk full");
    }

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(
            KeylockError::IllegalArgument(String::new()).error_code(),
            PARAMETER_VALIDATE_ERROR
        );
        assert_eq!(
            KeylockError::StorageError(String::new()).error_code(),
            DATA_ACCESS_ERROR
        );
    }

    #[test]
    fn test_app_error_from_anyhow() {
        let anyhow_err = anyhow::anyhow!("test error");
        let app_err = AppError::from(anyhow_err);
        assert_eq!(format!("{}", app_err), "test error");
        assert_eq!(app_err.error_code(), SERVER_ERROR);
    }

    #[test]
    fn test_app_error_keeps_keylock_code() {
        let app_err = AppError::from(anyhow::Error::new(KeylockError::IllegalArgument(
            "lock_name".to_string(),
        )));
        assert_eq!(app_err.error_code(), PARAMETER_VALIDATE_ERROR);
        assert!(app_err.downcast_ref::<KeylockError>().is_some());
    }
}
