//! Runner states and outcomes.

use std::fmt;

/// Where a run is in its lifecycle.
///
/// ```text
/// Idle -> AttemptingAcquire -> NotAcquired
///                           -> Acquired -> Running -> Releasing -> Released
///                                                               -> ReleaseFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    AttemptingAcquire,
    NotAcquired,
    Acquired,
    Running,
    Releasing,
    Released,
    ReleaseFailed,
}

impl GateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateState::Idle => "idle",
            GateState::AttemptingAcquire => "attempting_acquire",
            GateState::NotAcquired => "not_acquired",
            GateState::Acquired => "acquired",
            GateState::Running => "running",
            GateState::Releasing => "releasing",
            GateState::Released => "released",
            GateState::ReleaseFailed => "release_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GateState::NotAcquired | GateState::Released | GateState::ReleaseFailed
        )
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: GateState) -> bool {
        use GateState::*;
        matches!(
            (self, next),
            (Idle, AttemptingAcquire)
                | (AttemptingAcquire, NotAcquired)
                | (AttemptingAcquire, Acquired)
                | (Acquired, Running)
                | (Running, Releasing)
                | (Releasing, Released)
                | (Releasing, ReleaseFailed)
        )
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a run ended, short of a release failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every lease on the key was taken; the work did not run.
    NotAcquired,

    /// The store failed while granting the lease; the work did not run.
    AcquireFailed { error: String },

    /// The work ran and returned successfully.
    Completed { forwarded: u64 },

    /// The work ran and failed. The lease was still released.
    WorkFailed { error: String, forwarded: u64 },
}

impl RunOutcome {
    /// Whether the work unit was invoked.
    pub fn ran(&self) -> bool {
        matches!(
            self,
            RunOutcome::Completed { .. } | RunOutcome::WorkFailed { .. }
        )
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::NotAcquired => write!(f, "lock not acquired"),
            RunOutcome::AcquireFailed { error } => write!(f, "lock acquisition failed: {}", error),
            RunOutcome::Completed { forwarded } => {
                write!(f, "completed ({} lease renewal(s))", forwarded)
            }
            RunOutcome::WorkFailed { error, forwarded } => write!(
                f,
                "work failed after {} lease renewal(s): {}",
                forwarded, error
            ),
        }
    }
}
