//! The acquire / run / release state machine.

use super::config::{RunnerConfig, WorkUnit};
use super::state::{GateState, RunOutcome};
use crate::error::{GateError, Result};
use crate::progress::{Clock, ProgressSignal, SystemClock, Throttle};
use crate::semaphore::{CountingSemaphore, LockToken};
use std::sync::Arc;
use std::time::Duration;

/// Runs one [`WorkUnit`] under a lease from a [`CountingSemaphore`].
///
/// This is not reusable. [`run`](GatedRunner::run) consumes the runner, so a
/// new one must be built for every attempt.
pub struct GatedRunner<S, W> {
    semaphore: S,
    config: RunnerConfig<W>,
    clock: Arc<dyn Clock>,
}

impl<S, W> GatedRunner<S, W>
where
    S: CountingSemaphore,
    W: WorkUnit,
{
    /// Create a runner. Makes no calls to the semaphore.
    pub fn new(semaphore: S, config: RunnerConfig<W>) -> Self {
        Self::with_clock(semaphore, config, Arc::new(SystemClock))
    }

    /// Create a runner whose progress throttle reads time from `clock`.
    pub fn with_clock(semaphore: S, config: RunnerConfig<W>, clock: Arc<dyn Clock>) -> Self {
        Self {
            semaphore,
            config,
            clock,
        }
    }

    pub fn lock_key(&self) -> &str {
        &self.config.lock_key
    }

    /// Acquire the lease, run the work while holding it, and release it.
    ///
    /// Returns `Err` only with [`GateError::ReleaseFailed`]. Contention,
    /// store failures during acquisition, and work failures are logged and
    /// reported through [`RunOutcome`].
    ///
    /// If the work unit panics, the lease is released while unwinding and
    /// the panic continues.
    pub fn run(self) -> Result<RunOutcome> {
        let GatedRunner {
            semaphore,
            config,
            clock,
        } = self;
        let RunnerConfig {
            mut work,
            lock_key,
            lock_timeout_secs,
            max_lock_count,
            observer,
        } = config;
        let key = lock_key.as_str();
        let timeout = Duration::from_secs(lock_timeout_secs);
        let mut state = GateState::Idle;

        enter(&mut state, GateState::AttemptingAcquire, key);
        let token = match semaphore.attempt_to_acquire_lock(key, timeout, max_lock_count) {
            Ok(Some(token)) => token,
            Ok(None) => {
                enter(&mut state, GateState::NotAcquired, key);
                return Ok(RunOutcome::NotAcquired);
            }
            Err(e) => {
                tracing::error!(lock_key = %key, "failed to acquire lock: {}", e);
                enter(&mut state, GateState::NotAcquired, key);
                return Ok(RunOutcome::AcquireFailed {
                    error: e.to_string(),
                });
            }
        };
        enter(&mut state, GateState::Acquired, key);

        let lease = HeldLease::new(&semaphore, key, token.clone());
        let (result, forwarded) = {
            let renew = Box::new(|| semaphore.refresh_lock_timeout(key, &token, timeout));
            // The grant itself is a full lease; renewing inside the first
            // interval would only add store traffic.
            let throttle = Throttle::for_lease(lock_timeout_secs).primed_at(clock.now());
            let progress =
                ProgressSignal::new(key, clock.as_ref(), throttle, renew, observer.as_deref());

            enter(&mut state, GateState::Running, key);
            let result = work.run(&progress);
            (result, progress.forwarded())
        };

        enter(&mut state, GateState::Releasing, key);
        if let Err(e) = lease.release() {
            enter(&mut state, GateState::ReleaseFailed, key);
            if let Err(work_error) = &result {
                tracing::error!(lock_key = %key, "work unit failed: {:#}", work_error);
            }
            return Err(e);
        }
        enter(&mut state, GateState::Released, key);

        Ok(match result {
            Ok(()) => RunOutcome::Completed { forwarded },
            Err(e) => {
                tracing::error!(lock_key = %key, "work unit failed: {:#}", e);
                RunOutcome::WorkFailed {
                    error: format!("{:#}", e),
                    forwarded,
                }
            }
        })
    }
}

fn enter(state: &mut GateState, next: GateState, key: &str) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal transition {} -> {}",
        state,
        next
    );
    tracing::debug!(lock_key = %key, from = %state, to = %next, "gate transition");
    *state = next;
}

/// A lease that is released when dropped.
///
/// The normal path calls [`HeldLease::release`] so the error can be
/// returned. The drop path only runs while unwinding from a panicking work
/// unit, where a release failure can only be logged.
struct HeldLease<'a, S: CountingSemaphore> {
    semaphore: &'a S,
    key: &'a str,
    token: Option<LockToken>,
}

impl<'a, S: CountingSemaphore> HeldLease<'a, S> {
    fn new(semaphore: &'a S, key: &'a str, token: LockToken) -> Self {
        Self {
            semaphore,
            key,
            token: Some(token),
        }
    }

    fn release(mut self) -> Result<()> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };
        self.semaphore
            .release_lock(self.key, &token)
            .map_err(|e| match e {
                GateError::ReleaseFailed(_) => e,
                other => GateError::ReleaseFailed(format!("lock '{}': {}", self.key, other)),
            })
    }
}

impl<S: CountingSemaphore> Drop for HeldLease<'_, S> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take()
            && let Err(e) = self.semaphore.release_lock(self.key, &token)
        {
            tracing::warn!(lock_key = %self.key, "failed to release lock while unwinding: {}", e);
        }
    }
}
