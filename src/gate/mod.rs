//! Lock-gated execution of a single unit of work.
//!
//! A [`GatedRunner`] wraps one attempt at running a [`WorkUnit`]:
//!
//! 1. try to take a lease on the configured key;
//! 2. if the store declines, do nothing (contention is not an error);
//! 3. otherwise run the work, renewing the lease whenever the work signals
//!    progress (at most once per third of the lease timeout);
//! 4. release the lease on every way out of the work.
//!
//! Work failures are logged and absorbed so that a periodic scheduler keeps
//! running. A failed release is the one error that escapes
//! [`GatedRunner::run`]: it means the store and this process disagree about
//! who holds the key.
//!
//! Runners are single-use. `run` consumes the runner; build a new one from a
//! fresh [`RunnerConfig`] for the next attempt.

mod config;
mod runner;
mod state;


pub use config::{RunnerConfig, RunnerConfigBuilder, WorkUnit, work_fn};
pub use runner::GatedRunner;
pub use state::{GateState, RunOutcome};
