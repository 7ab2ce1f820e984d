//! Error types for semgate.
//!
//! Uses thiserror for derive macros. Only [`GateError::ReleaseFailed`] is
//! allowed to cross the boundary of [`GatedRunner::run`](crate::gate::GatedRunner::run);
//! every other failure during a run is absorbed and logged.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for semgate operations.
#[derive(Error, Debug)]
pub enum GateError {
    /// A runner or store was configured with missing or out-of-range values.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The lock store failed (I/O, corrupt lease metadata, poisoned state).
    #[error("Lock store failure: {0}")]
    Lock(String),

    /// A refresh named a lease the store no longer holds.
    #[error("Lease lost: {0}")]
    LeaseLost(String),

    /// A release named a lease the store no longer holds.
    #[error("Lock release failed: {0}")]
    ReleaseFailed(String),

    /// User provided invalid arguments to the CLI.
    #[error("{0}")]
    UserError(String),
}

impl GateError {
    /// Whether this error must propagate to the scheduler instead of being
    /// absorbed by the runner.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GateError::ReleaseFailed(_))
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            GateError::InvalidConfig(_) => exit_codes::USER_ERROR,
            GateError::UserError(_) => exit_codes::USER_ERROR,
            GateError::Lock(_) => exit_codes::LOCK_FAILURE,
            GateError::LeaseLost(_) => exit_codes::LOCK_FAILURE,
            GateError::ReleaseFailed(_) => exit_codes::RELEASE_FAILURE,
        }
    }
}

/// Result type alias for semgate operations.
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_release_failure_is_fatal() {
        assert!(GateError::ReleaseFailed("k".to_string()).is_fatal());
        assert!(!GateError::Lock("io".to_string()).is_fatal());
        assert!(!GateError::LeaseLost("k".to_string()).is_fatal());
        assert!(!GateError::InvalidConfig("bad".to_string()).is_fatal());
        assert!(!GateError::UserError("bad".to_string()).is_fatal());
    }

    #[test]
    fn invalid_config_has_user_error_exit_code() {
        let err = GateError::InvalidConfig("timeout".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn release_failure_has_its_own_exit_code() {
        let err = GateError::ReleaseFailed("job-A".to_string());
        assert_eq!(err.exit_code(), exit_codes::RELEASE_FAILURE);
    }

    #[test]
    fn lock_errors_share_exit_code() {
        assert_eq!(
            GateError::Lock("io".to_string()).exit_code(),
            exit_codes::LOCK_FAILURE
        );
        assert_eq!(
            GateError::LeaseLost("job-A".to_string()).exit_code(),
            exit_codes::LOCK_FAILURE
        );
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = GateError::InvalidConfig("lock key cannot be absent".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: lock key cannot be absent"
        );

        let err = GateError::ReleaseFailed("token expired".to_string());
        assert_eq!(err.to_string(), "Lock release failed: token expired");
    }
}
