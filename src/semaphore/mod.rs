//! Counting semaphores with leases.
//!
//! A [`CountingSemaphore`] hands out up to `max_lock_count` leases per key.
//! Each lease is identified by a [`LockToken`] and expires unless refreshed
//! within its timeout. Contenders share nothing but the store itself.
//!
//! # Stores
//!
//! - [`MemorySemaphore`]: leases live in process memory. Useful for
//!   embedding several runners in one process and for tests.
//! - [`FileSemaphore`]: leases are lock files in a shared directory, created
//!   with exclusive-create semantics. Works across processes on one host (or
//!   on a filesystem with atomic create and rename).
//!
//! # Expiry
//!
//! An expired lease is dead: refreshing it fails with
//! [`GateError::LeaseLost`](crate::error::GateError::LeaseLost) and releasing
//! it fails with [`GateError::ReleaseFailed`](crate::error::GateError::ReleaseFailed).
//! Its slot may be handed to the next contender.

mod file;
mod memory;


use crate::error::{GateError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use file::{FileSemaphore, LeaseInfo, LeaseMetadata};
pub use memory::MemorySemaphore;

/// Opaque proof of one lease grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockToken(String);

impl LockToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh, globally unique token.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A store that grants, renews, and revokes leases on string keys.
pub trait CountingSemaphore: Send + Sync {
    /// Try to take one of `max_lock_count` leases on `key`.
    ///
    /// Returns `Ok(None)` when every lease is already held. Never blocks
    /// waiting for a holder to leave.
    fn attempt_to_acquire_lock(
        &self,
        key: &str,
        timeout: Duration,
        max_lock_count: u32,
    ) -> Result<Option<LockToken>>;

    /// Reset the remaining time on a held lease to `timeout`.
    fn refresh_lock_timeout(&self, key: &str, token: &LockToken, timeout: Duration) -> Result<()>;

    /// Give a lease back.
    ///
    /// Fails with `GateError::ReleaseFailed` when `token` no longer names a
    /// live lease on `key`.
    fn release_lock(&self, key: &str, token: &LockToken) -> Result<()>;
}

impl<S: CountingSemaphore + ?Sized> CountingSemaphore for &S {
    fn attempt_to_acquire_lock(
        &self,
        key: &str,
        timeout: Duration,
        max_lock_count: u32,
    ) -> Result<Option<LockToken>> {
        (**self).attempt_to_acquire_lock(key, timeout, max_lock_count)
    }

    fn refresh_lock_timeout(&self, key: &str, token: &LockToken, timeout: Duration) -> Result<()> {
        (**self).refresh_lock_timeout(key, token, timeout)
    }

    fn release_lock(&self, key: &str, token: &LockToken) -> Result<()> {
        (**self).release_lock(key, token)
    }
}

impl<S: CountingSemaphore + ?Sized> CountingSemaphore for Arc<S> {
    fn attempt_to_acquire_lock(
        &self,
        key: &str,
        timeout: Duration,
        max_lock_count: u32,
    ) -> Result<Option<LockToken>> {
        (**self).attempt_to_acquire_lock(key, timeout, max_lock_count)
    }

    fn refresh_lock_timeout(&self, key: &str, token: &LockToken, timeout: Duration) -> Result<()> {
        (**self).refresh_lock_timeout(key, token, timeout)
    }

    fn release_lock(&self, key: &str, token: &LockToken) -> Result<()> {
        (**self).release_lock(key, token)
    }
}

/// Reject arguments no store can honor.
pub(crate) fn check_lease_args(key: &str, timeout: Duration, max_lock_count: u32) -> Result<()> {
    if key.is_empty() {
        return Err(GateError::InvalidConfig(
            "lock key cannot be empty".to_string(),
        ));
    }
    if timeout.is_zero() {
        return Err(GateError::InvalidConfig(
            "lease timeout must be greater than 0".to_string(),
        ));
    }
    if max_lock_count == 0 {
        return Err(GateError::InvalidConfig(
            "max lock count must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
