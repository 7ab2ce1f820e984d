//! Interval throttle for lease renewals.

use std::time::{Duration, Instant};

/// Decides whether a liveness signal is forwarded or dropped.
///
/// A signal is forwarded when at least `min_interval` has passed since the
/// last forwarded one. A fresh throttle has no last-forwarded time, so its
/// first signal is always forwarded.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last_forwarded: Option<Instant>,
}

impl Throttle {
    /// Create a throttle with an explicit minimum interval.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_forwarded: None,
        }
    }

    /// Create the throttle for a lease of `lock_timeout_secs`.
    ///
    /// The interval is a third of the lease timeout in milliseconds, which
    /// leaves at least two renewal windows inside every lease lifetime.
    pub fn for_lease(lock_timeout_secs: u64) -> Self {
        Self::new(Duration::from_millis(
            lock_timeout_secs.saturating_mul(1000) / 3,
        ))
    }

    /// Treat `at` as the last forwarded signal.
    ///
    /// Used when the lease was just granted: a signal arriving before the
    /// first interval has passed would renew a lease that is already fresh.
    pub fn primed_at(mut self, at: Instant) -> Self {
        self.last_forwarded = Some(at);
        self
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_forwarded(&self) -> Option<Instant> {
        self.last_forwarded
    }

    /// Record a signal at `now` and report whether it should be forwarded.
    pub fn try_forward(&mut self, now: Instant) -> bool {
        let due = match self.last_forwarded {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        };
        if due {
            self.last_forwarded = Some(now);
        }
        due
    }
}
