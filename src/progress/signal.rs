//! The liveness handle given to a running work unit.

use super::clock::Clock;
use super::throttle::Throttle;
use crate::error::Result;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A forwarded liveness signal, as seen by a [`ProgressObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// The lock key whose lease was renewed.
    pub lock_key: String,
    /// 1-based count of forwarded signals in this run.
    pub sequence: u64,
    /// When the signal was forwarded.
    pub forwarded_at: Instant,
}

/// External listener for forwarded liveness signals.
///
/// Called after the lease renewal for a signal succeeded.
pub trait ProgressObserver: Send + Sync {
    fn progress_made(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn progress_made(&self, event: &ProgressEvent) {
        self(event)
    }
}

type Renewal<'a> = Box<dyn Fn() -> Result<()> + Send + Sync + 'a>;

/// Handle a work unit uses to report that it is still alive.
///
/// Each [`signal`](ProgressSignal::signal) goes through the throttle; the
/// ones that pass renew the lease and notify the observer. The handle is
/// `Sync`, so work that fans out to threads may share it by reference.
pub struct ProgressSignal<'a> {
    lock_key: &'a str,
    clock: &'a dyn Clock,
    throttle: Mutex<Throttle>,
    renew: Renewal<'a>,
    observer: Option<&'a dyn ProgressObserver>,
    received: AtomicU64,
    forwarded: AtomicU64,
}

impl<'a> ProgressSignal<'a> {
    pub(crate) fn new(
        lock_key: &'a str,
        clock: &'a dyn Clock,
        throttle: Throttle,
        renew: Renewal<'a>,
        observer: Option<&'a dyn ProgressObserver>,
    ) -> Self {
        Self {
            lock_key,
            clock,
            throttle: Mutex::new(throttle),
            renew,
            observer,
            received: AtomicU64::new(0),
            forwarded: AtomicU64::new(0),
        }
    }

    /// Report liveness.
    ///
    /// Returns an error only when a forwarded signal failed to renew the
    /// lease, which usually means the lease was lost and the work should
    /// stop. Dropped signals always return `Ok`.
    pub fn signal(&self) -> Result<()> {
        self.received.fetch_add(1, Ordering::Relaxed);

        let now = self.clock.now();
        let due = self
            .throttle
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .try_forward(now);
        if !due {
            return Ok(());
        }

        (self.renew)()?;

        let sequence = self.forwarded.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(lock_key = %self.lock_key, sequence, "lease renewed");

        if let Some(observer) = self.observer {
            observer.progress_made(&ProgressEvent {
                lock_key: self.lock_key.to_string(),
                sequence,
                forwarded_at: now,
            });
        }
        Ok(())
    }

    pub fn lock_key(&self) -> &str {
        self.lock_key
    }

    /// Number of `signal()` calls made so far.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Number of signals that were forwarded as renewals.
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for ProgressSignal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSignal")
            .field("lock_key", &self.lock_key)
            .field("received", &self.received())
            .field("forwarded", &self.forwarded())
            .finish_non_exhaustive()
    }
}
