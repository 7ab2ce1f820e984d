//! Liveness signalling for work that runs under a lease.
//!
//! Work reports "still alive" through a [`ProgressSignal`] as often as it
//! likes. The signal is rate-limited by a [`Throttle`] so that at most one
//! lease renewal is forwarded per interval, no matter how chatty the work is.
//! Dropped signals are not queued or replayed.

mod clock;
mod signal;
mod throttle;


pub use clock::{Clock, ManualClock, SystemClock};
pub use signal::{ProgressEvent, ProgressObserver, ProgressSignal};
pub use throttle::Throttle;
