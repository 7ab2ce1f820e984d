//! Exit code constants for the semgate CLI.
//!
//! - 0: Success (including "lock not acquired" and absorbed work failures)
//! - 1: User error (bad args, invalid configuration)
//! - 2: Work failure (only with `--strict`)
//! - 3: Lock store failure
//! - 4: Lock not acquired (only with `--strict`)
//! - 5: Lock release failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// The work unit failed while the lock was held.
pub const WORK_FAILURE: i32 = 2;

/// The lock store could not be read or written.
pub const LOCK_FAILURE: i32 = 3;

/// Every holder slot for the key was taken.
pub const NOT_ACQUIRED: i32 = 4;

/// The lock could not be released; the store disagrees about who holds it.
pub const RELEASE_FAILURE: i32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            WORK_FAILURE,
            LOCK_FAILURE,
            NOT_ACQUIRED,
            RELEASE_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
    }
}
