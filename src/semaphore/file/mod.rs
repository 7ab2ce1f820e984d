//! Counting semaphore backed by lock files in a shared directory.
//!
//! # Lock Files
//!
//! Each lease on key `K` occupies one slot file `K.<n>.lock` inside the
//! semaphore directory. Slot files are created with **create_new**
//! semantics, so two processes can never both believe they created the same
//! slot.
//!
//! # Lease Metadata
//!
//! Each slot file contains JSON metadata:
//! - `token`: the lease token handed to the holder
//! - `owner`: `user@HOST` of the holder
//! - `pid`: the holder's process ID (optional)
//! - `acquired_at` / `expires_at`: RFC3339 timestamps
//!
//! # Key Guard
//!
//! Acquire, refresh, release, and clear on one key run under a short-lived
//! `K.guard` file, so that counting live slots, reclaiming expired ones, and
//! creating a new one happen as one step.

mod atomic;
mod guard;
mod metadata;
mod store;

pub use metadata::LeaseMetadata;
pub use store::{FileSemaphore, LeaseInfo};
