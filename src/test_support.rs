use crate::error::{GateError, Result};
use crate::semaphore::{CountingSemaphore, LockToken};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// One call made against a [`RecordingSemaphore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Acquire {
        key: String,
        timeout: Duration,
        max_lock_count: u32,
    },
    Refresh {
        key: String,
        token: LockToken,
        timeout: Duration,
    },
    Release {
        key: String,
        token: LockToken,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcquireBehavior {
    Grant,
    Decline,
    Fail,
}

/// Lock service double that records every call and answers as scripted.
pub(crate) struct RecordingSemaphore {
    acquire: AcquireBehavior,
    refresh_error: Option<fn(String) -> GateError>,
    release_error: Option<fn(String) -> GateError>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingSemaphore {
    /// Grants a token to every acquire.
    pub(crate) fn granting() -> Self {
        Self::with(AcquireBehavior::Grant)
    }

    /// Answers every acquire with "no token".
    pub(crate) fn declining() -> Self {
        Self::with(AcquireBehavior::Decline)
    }

    /// Fails every acquire with a store error.
    pub(crate) fn failing_acquire() -> Self {
        Self::with(AcquireBehavior::Fail)
    }

    fn with(acquire: AcquireBehavior) -> Self {
        Self {
            acquire,
            refresh_error: None,
            release_error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail every refresh with the error built by `make`.
    pub(crate) fn failing_refresh(mut self, make: fn(String) -> GateError) -> Self {
        self.refresh_error = Some(make);
        self
    }

    /// Fail every release with the error built by `make`.
    pub(crate) fn failing_release(mut self, make: fn(String) -> GateError) -> Self {
        self.release_error = Some(make);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.log().clone()
    }

    pub(crate) fn acquires(&self) -> usize {
        self.count(|c| matches!(c, Call::Acquire { .. }))
    }

    pub(crate) fn refreshes(&self) -> usize {
        self.count(|c| matches!(c, Call::Refresh { .. }))
    }

    pub(crate) fn releases(&self) -> usize {
        self.count(|c| matches!(c, Call::Release { .. }))
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.log().iter().filter(|c| pred(c)).count()
    }

    fn log(&self) -> MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl CountingSemaphore for RecordingSemaphore {
    fn attempt_to_acquire_lock(
        &self,
        key: &str,
        timeout: Duration,
        max_lock_count: u32,
    ) -> Result<Option<LockToken>> {
        self.log().push(Call::Acquire {
            key: key.to_string(),
            timeout,
            max_lock_count,
        });
        match self.acquire {
            AcquireBehavior::Grant => Ok(Some(LockToken::new("token-1"))),
            AcquireBehavior::Decline => Ok(None),
            AcquireBehavior::Fail => Err(GateError::Lock("store unreachable".to_string())),
        }
    }

    fn refresh_lock_timeout(&self, key: &str, token: &LockToken, timeout: Duration) -> Result<()> {
        self.log().push(Call::Refresh {
            key: key.to_string(),
            token: token.clone(),
            timeout,
        });
        match self.refresh_error {
            Some(make) => Err(make(key.to_string())),
            None => Ok(()),
        }
    }

    fn release_lock(&self, key: &str, token: &LockToken) -> Result<()> {
        self.log().push(Call::Release {
            key: key.to_string(),
            token: token.clone(),
        });
        match self.release_error {
            Some(make) => Err(make(key.to_string())),
            None => Ok(()),
        }
    }
}
