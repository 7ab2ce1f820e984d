//! Per-attempt runner configuration and its validation.

use crate::error::{GateError, Result};
use crate::progress::{ProgressObserver, ProgressSignal};
use std::fmt;
use std::sync::Arc;

/// The work a runner executes while it holds the lease.
///
/// Implementations should call [`ProgressSignal::signal`] more often than
/// the lease timeout; the runner does not renew the lease on its own.
pub trait WorkUnit {
    fn run(&mut self, progress: &ProgressSignal<'_>) -> anyhow::Result<()>;
}

impl<F> WorkUnit for F
where
    F: FnMut(&ProgressSignal<'_>) -> anyhow::Result<()>,
{
    fn run(&mut self, progress: &ProgressSignal<'_>) -> anyhow::Result<()> {
        self(progress)
    }
}

/// Pin a closure's signature so it can be passed as a [`WorkUnit`] without
/// annotating its argument and return types.
pub fn work_fn<F>(f: F) -> F
where
    F: FnMut(&ProgressSignal<'_>) -> anyhow::Result<()>,
{
    f
}

/// Validated configuration for one [`GatedRunner`](super::GatedRunner).
///
/// Only obtainable through [`RunnerConfigBuilder::build`], so every value
/// of this type has passed validation.
pub struct RunnerConfig<W> {
    pub(super) work: W,
    pub(super) lock_key: String,
    pub(super) lock_timeout_secs: u64,
    pub(super) max_lock_count: u32,
    pub(super) observer: Option<Arc<dyn ProgressObserver>>,
}

impl<W: WorkUnit> RunnerConfig<W> {
    pub fn builder() -> RunnerConfigBuilder<W> {
        RunnerConfigBuilder::new()
    }
}

impl<W> RunnerConfig<W> {
    pub fn lock_key(&self) -> &str {
        &self.lock_key
    }

    pub fn lock_timeout_secs(&self) -> u64 {
        self.lock_timeout_secs
    }

    pub fn max_lock_count(&self) -> u32 {
        self.max_lock_count
    }
}

impl<W> fmt::Debug for RunnerConfig<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("lock_key", &self.lock_key)
            .field("lock_timeout_secs", &self.lock_timeout_secs)
            .field("max_lock_count", &self.max_lock_count)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`RunnerConfig`].
///
/// The work unit, lock key, lock timeout and max lock count are required;
/// the observer is optional.
pub struct RunnerConfigBuilder<W> {
    work: Option<W>,
    lock_key: Option<String>,
    lock_timeout_secs: u64,
    max_lock_count: u32,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl<W: WorkUnit> RunnerConfigBuilder<W> {
    pub fn new() -> Self {
        Self {
            work: None,
            lock_key: None,
            lock_timeout_secs: 0,
            max_lock_count: 0,
            observer: None,
        }
    }

    /// The work to run while the lease is held.
    pub fn work(mut self, work: W) -> Self {
        self.work = Some(work);
        self
    }

    /// The key every contender for the same resource uses.
    pub fn lock_key(mut self, key: impl Into<String>) -> Self {
        self.lock_key = Some(key.into());
        self
    }

    /// Lease timeout in seconds. The work must finish or signal progress
    /// before it lapses.
    pub fn lock_timeout_secs(mut self, secs: u64) -> Self {
        self.lock_timeout_secs = secs;
        self
    }

    /// How many leases may be held on the key at once. Use 1 for a singleton.
    pub fn max_lock_count(mut self, count: u32) -> Self {
        self.max_lock_count = count;
        self
    }

    /// Also notify `observer` of every forwarded progress signal.
    pub fn observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validate and build.
    ///
    /// Validation rules:
    /// - the work unit must be set
    /// - the lock key must be set and non-empty
    /// - `lock_timeout_secs` must be at least 1
    /// - `max_lock_count` must be at least 1
    pub fn build(self) -> Result<RunnerConfig<W>> {
        let Some(work) = self.work else {
            return Err(GateError::InvalidConfig(
                "work unit cannot be absent".to_string(),
            ));
        };
        let Some(lock_key) = self.lock_key else {
            return Err(GateError::InvalidConfig(
                "lock key cannot be absent".to_string(),
            ));
        };
        if lock_key.is_empty() {
            return Err(GateError::InvalidConfig(
                "lock key cannot be empty".to_string(),
            ));
        }
        if self.lock_timeout_secs < 1 {
            return Err(GateError::InvalidConfig(
                "lock timeout cannot be less than one second".to_string(),
            ));
        }
        if self.max_lock_count < 1 {
            return Err(GateError::InvalidConfig(
                "max lock count cannot be less than one".to_string(),
            ));
        }

        Ok(RunnerConfig {
            work,
            lock_key,
            lock_timeout_secs: self.lock_timeout_secs,
            max_lock_count: self.max_lock_count,
            observer: self.observer,
        })
    }
}

impl<W: WorkUnit> Default for RunnerConfigBuilder<W> {
    fn default() -> Self {
        Self::new()
    }
}
