//! In-process counting semaphore.

use super::{CountingSemaphore, LockToken, check_lease_args};
use crate::error::{GateError, Result};
use crate::progress::{Clock, SystemClock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct MemoryLease {
    token: LockToken,
    expires_at: Instant,
}

/// Counting semaphore whose leases live in a `Mutex<HashMap>`.
///
/// Share it between runners with `Arc<MemorySemaphore>` or `&MemorySemaphore`.
pub struct MemorySemaphore {
    clock: Arc<dyn Clock>,
    leases: Mutex<HashMap<String, Vec<MemoryLease>>>,
}

impl MemorySemaphore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Use `clock` to decide when leases expire.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            leases: Mutex::new(HashMap::new()),
        }
    }

    /// Number of live leases on `key`.
    pub fn holder_count(&self, key: &str) -> usize {
        let now = self.clock.now();
        self.state()
            .get(key)
            .map(|leases| leases.iter().filter(|l| l.expires_at > now).count())
            .unwrap_or(0)
    }

    /// Number of keys with at least one lease still tracked.
    pub fn key_count(&self) -> usize {
        self.state().len()
    }

    fn state(&self) -> MutexGuard<'_, HashMap<String, Vec<MemoryLease>>> {
        self.leases.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for MemorySemaphore {
    fn default() -> Self {
        Self::new()
    }
}

impl CountingSemaphore for MemorySemaphore {
    fn attempt_to_acquire_lock(
        &self,
        key: &str,
        timeout: Duration,
        max_lock_count: u32,
    ) -> Result<Option<LockToken>> {
        check_lease_args(key, timeout, max_lock_count)?;

        let now = self.clock.now();
        let expires_at = lease_deadline(now, timeout)?;
        let mut state = self.state();
        // Keys whose holders have all lapsed would otherwise stay forever.
        state.retain(|_, leases| {
            leases.retain(|l| l.expires_at > now);
            !leases.is_empty()
        });

        let leases = state.entry(key.to_string()).or_default();
        if leases.len() >= max_lock_count as usize {
            return Ok(None);
        }

        let token = LockToken::generate();
        leases.push(MemoryLease {
            token: token.clone(),
            expires_at,
        });
        Ok(Some(token))
    }

    fn refresh_lock_timeout(&self, key: &str, token: &LockToken, timeout: Duration) -> Result<()> {
        let now = self.clock.now();
        let expires_at = lease_deadline(now, timeout)?;
        let mut state = self.state();
        let lease = state
            .get_mut(key)
            .and_then(|leases| leases.iter_mut().find(|l| &l.token == token))
            .filter(|l| l.expires_at > now)
            .ok_or_else(|| {
                GateError::LeaseLost(format!("lock '{}' is not held by token {}", key, token))
            })?;

        lease.expires_at = expires_at;
        Ok(())
    }

    fn release_lock(&self, key: &str, token: &LockToken) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.state();
        let Some(leases) = state.get_mut(key) else {
            return Err(GateError::ReleaseFailed(format!(
                "lock '{}' has no holders",
                key
            )));
        };

        let Some(index) = leases.iter().position(|l| &l.token == token) else {
            return Err(GateError::ReleaseFailed(format!(
                "lock '{}' is not held by token {}",
                key, token
            )));
        };

        let lease = leases.swap_remove(index);
        if leases.is_empty() {
            state.remove(key);
        }

        if lease.expires_at <= now {
            return Err(GateError::ReleaseFailed(format!(
                "lease on '{}' expired before it was released",
                key
            )));
        }
        Ok(())
    }
}

fn lease_deadline(now: Instant, timeout: Duration) -> Result<Instant> {
    now.checked_add(timeout).ok_or_else(|| {
        GateError::InvalidConfig(format!("lease timeout of {}s is out of range", timeout.as_secs()))
    })
}
