//! Semgate: lock-gated execution.
//!
//! Wraps a unit of work so that it only runs while a leased lock on a key is
//! held, renews the lease while the work reports progress, and releases the
//! lease on every way out. Processes that share nothing but a
//! [`CountingSemaphore`](semaphore::CountingSemaphore) get bounded
//! concurrency (often exactly one runner) per key.
//!
//! ```no_run
//! use semgate::gate::{GatedRunner, RunnerConfig, work_fn};
//! use semgate::semaphore::FileSemaphore;
//!
//! let config = RunnerConfig::builder()
//!     .work(work_fn(|progress| {
//!         for batch in 0..10 {
//!             println!("batch {}", batch);
//!             progress.signal()?;
//!         }
//!         Ok(())
//!     }))
//!     .lock_key("nightly-report")
//!     .lock_timeout_secs(60)
//!     .max_lock_count(1)
//!     .build()?;
//!
//! GatedRunner::new(FileSemaphore::new("/var/lock/semgate"), config).run()?;
//! # Ok::<(), semgate::error::GateError>(())
//! ```

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod gate;
pub mod progress;
pub mod semaphore;

#[cfg(test)]
pub(crate) mod test_support;
