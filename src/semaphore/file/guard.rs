//! RAII guard serializing mutations of one key.

use crate::error::{GateError, Result};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

/// How long to wait for another process to leave the key guard.
const GUARD_WAIT: Duration = Duration::from_secs(10);

/// Guards older than this belong to a process that died mid-operation.
const GUARD_ABANDONED_AFTER: Duration = Duration::from_secs(30);

const GUARD_POLL: Duration = Duration::from_millis(5);

/// Exclusive guard file for one key.
///
/// When dropped, the guard file is deleted. If deletion fails, a warning is
/// logged but no panic occurs.
#[derive(Debug)]
pub(super) struct KeyGuard {
    path: PathBuf,
}

impl KeyGuard {
    /// Create the guard file, waiting briefly while another process holds it.
    pub(super) fn acquire(path: PathBuf) -> Result<Self> {
        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if is_abandoned(&path) && retire_abandoned(&path) {
                        tracing::warn!(path = %path.display(), "removed abandoned key guard");
                        continue;
                    }
                    if started.elapsed() >= GUARD_WAIT {
                        return Err(GateError::Lock(format!(
                            "timed out waiting for key guard '{}'",
                            path.display()
                        )));
                    }
                    thread::sleep(GUARD_POLL);
                }
                Err(e) => {
                    return Err(GateError::Lock(format!(
                        "failed to create key guard '{}': {}",
                        path.display(),
                        e
                    )));
                }
            }
        }
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), err = %e, "failed to remove key guard");
        }
    }
}

/// Move an abandoned guard aside and delete it.
///
/// Two waiters can both judge the same guard abandoned. The rename makes
/// only one of them take that file; the other either finds nothing to rename
/// or takes the fresh guard the winner just created. The age is checked
/// again on the moved file, and a fresh guard is linked back into place.
fn retire_abandoned(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let moved = path.with_file_name(format!(".{}.{}.stale", name, uuid::Uuid::new_v4()));
    if fs::rename(path, &moved).is_err() {
        return false;
    }
    settle_moved_guard(path, &moved)
}

/// Decide what to do with a guard file that was moved to `moved`.
///
/// Returns `true` if it was abandoned and is now gone.
fn settle_moved_guard(path: &Path, moved: &Path) -> bool {
    let abandoned = is_abandoned(moved);
    if !abandoned && let Err(e) = fs::hard_link(moved, path) {
        tracing::warn!(path = %path.display(), err = %e, "failed to restore live key guard");
    }
    if let Err(e) = fs::remove_file(moved) {
        tracing::warn!(path = %moved.display(), err = %e, "failed to remove moved key guard");
    }
    abandoned
}

fn is_abandoned(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > GUARD_ABANDONED_AFTER)
}
