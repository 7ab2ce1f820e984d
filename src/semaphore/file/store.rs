//! Slot allocation, renewal, release, listing, and clearing.

use super::atomic::atomic_write;
use super::guard::KeyGuard;
use super::metadata::LeaseMetadata;
use crate::error::{GateError, Result};
use crate::semaphore::{CountingSemaphore, LockToken, check_lease_args};
use chrono::Utc;
use regex::Regex;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, SystemTime};

static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("key pattern is a valid regex")
});

/// Information about one slot file.
#[derive(Debug, Clone)]
pub struct LeaseInfo {
    /// The lock key.
    pub key: String,

    /// Slot index within the key.
    pub slot: u32,

    /// The slot file path.
    pub path: PathBuf,

    /// The lease metadata.
    pub metadata: LeaseMetadata,

    /// Whether the lease has lapsed.
    pub expired: bool,
}

impl fmt::Display for LeaseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{} (owner: {}, age: {}, remaining: {}{})",
            self.key,
            self.slot,
            self.metadata.owner,
            self.metadata.age_string(),
            self.metadata.remaining_string(),
            if self.expired { ", EXPIRED" } else { "" }
        )
    }
}

/// Counting semaphore whose leases are slot files in `root`.
#[derive(Debug, Clone)]
pub struct FileSemaphore {
    root: PathBuf,
}

impl FileSemaphore {
    /// Use `root` as the semaphore directory. It is created on first use.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that `key` can name slot files: a letter or digit followed by
    /// letters, digits, `.`, `_` or `-`.
    pub fn validate_key(key: &str) -> Result<()> {
        validate_key(key)
    }

    fn slot_path(&self, key: &str, slot: u32) -> PathBuf {
        self.root.join(format!("{}.{}.lock", key, slot))
    }

    fn guard_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.guard", key))
    }

    fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            GateError::Lock(format!(
                "failed to create semaphore directory '{}': {}",
                self.root.display(),
                e
            ))
        })
    }

    fn guard(&self, key: &str) -> Result<KeyGuard> {
        validate_key(key)?;
        self.ensure_root()?;
        KeyGuard::acquire(self.guard_path(key))
    }

    /// All slot files currently present for `key`, by slot index.
    fn slots_of(&self, key: &str) -> Result<Vec<(u32, PathBuf)>> {
        let mut slots: Vec<(u32, PathBuf)> = self
            .read_slot_files()?
            .into_iter()
            .filter(|(k, _, _)| k == key)
            .map(|(_, slot, path)| (slot, path))
            .collect();
        slots.sort_by_key(|(slot, _)| *slot);
        Ok(slots)
    }

    /// Every `<key>.<slot>.lock` file in the semaphore directory.
    fn read_slot_files(&self) -> Result<Vec<(String, u32, PathBuf)>> {
        let mut files = Vec::new();

        if !self.root.exists() {
            return Ok(files);
        }

        let entries = fs::read_dir(&self.root).map_err(|e| {
            GateError::Lock(format!(
                "failed to read semaphore directory '{}': {}",
                self.root.display(),
                e
            ))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                GateError::Lock(format!("failed to read semaphore directory entry: {}", e))
            })?;
            let path = entry.path();
            if let Some((key, slot)) = parse_slot_file_name(&path) {
                files.push((key, slot, path));
            }
        }

        Ok(files)
    }

    /// Remove `path` if its lease has lapsed. Returns whether the slot is now free.
    ///
    /// A slot file that cannot be parsed counts as lapsed once it is older
    /// than `timeout`, so a holder that crashed mid-write cannot pin a slot.
    fn reclaim_if_expired(&self, path: &Path, timeout: Duration) -> Result<bool> {
        let lapsed = match LeaseMetadata::from_file(path) {
            Ok(meta) => meta.is_expired_at(Utc::now()),
            Err(_) => file_age(path).is_some_and(|age| age > timeout),
        };

        if lapsed {
            tracing::debug!(path = %path.display(), "reclaiming expired lease");
            remove_slot(path)?;
        }
        Ok(lapsed)
    }

    /// Find the slot file on `key` that carries `token`.
    fn find_token(&self, key: &str, token: &LockToken) -> Result<Option<(PathBuf, LeaseMetadata)>> {
        for (_, path) in self.slots_of(key)? {
            // Slots that cannot be parsed cannot belong to this token.
            if let Ok(meta) = LeaseMetadata::from_file(&path)
                && &meta.token == token
            {
                return Ok(Some((path, meta)));
            }
        }
        Ok(None)
    }

    /// List every lease in the semaphore directory, sorted by key and slot.
    ///
    /// Slot files that cannot be parsed are skipped.
    pub fn list_leases(&self) -> Result<Vec<LeaseInfo>> {
        let now = Utc::now();
        let mut leases: Vec<LeaseInfo> = self
            .read_slot_files()?
            .into_iter()
            .filter_map(|(key, slot, path)| {
                let metadata = LeaseMetadata::from_file(&path).ok()?;
                Some(LeaseInfo {
                    key,
                    slot,
                    path,
                    expired: metadata.is_expired_at(now),
                    metadata,
                })
            })
            .collect();

        leases.sort_by(|a, b| a.key.cmp(&b.key).then(a.slot.cmp(&b.slot)));
        Ok(leases)
    }

    /// Force-remove one slot, whether or not its lease is live.
    ///
    /// The caller is responsible for deciding that clearing a live lease is
    /// appropriate; its holder will fail to refresh or release it.
    pub fn clear_lease(&self, key: &str, slot: u32) -> Result<LeaseInfo> {
        let _guard = self.guard(key)?;
        let path = self.slot_path(key, slot);

        if !path.exists() {
            return Err(GateError::UserError(format!(
                "lease '{}#{}' does not exist at: {}",
                key,
                slot,
                path.display()
            )));
        }

        let metadata = LeaseMetadata::from_file(&path)?;
        let info = LeaseInfo {
            key: key.to_string(),
            slot,
            path: path.clone(),
            expired: metadata.is_expired(),
            metadata,
        };

        remove_slot(&path)?;
        Ok(info)
    }

    /// Remove every lapsed lease. Returns what was removed.
    pub fn clear_expired(&self) -> Result<Vec<LeaseInfo>> {
        let mut cleared = Vec::new();
        for lease in self.list_leases()?.into_iter().filter(|l| l.expired) {
            let _guard = self.guard(&lease.key)?;
            // Re-check under the guard; the holder may have refreshed.
            if let Ok(meta) = LeaseMetadata::from_file(&lease.path)
                && meta.token == lease.metadata.token
                && meta.is_expired()
            {
                remove_slot(&lease.path)?;
                cleared.push(lease);
            }
        }
        Ok(cleared)
    }
}

impl CountingSemaphore for FileSemaphore {
    fn attempt_to_acquire_lock(
        &self,
        key: &str,
        timeout: Duration,
        max_lock_count: u32,
    ) -> Result<Option<LockToken>> {
        check_lease_args(key, timeout, max_lock_count)?;
        let _guard = self.guard(key)?;

        let mut taken = Vec::new();
        for (slot, path) in self.slots_of(key)? {
            if !self.reclaim_if_expired(&path, timeout)? {
                taken.push(slot);
            }
        }

        if taken.len() >= max_lock_count as usize {
            return Ok(None);
        }

        // `taken` is sorted; pick the lowest free index.
        let slot = (0..)
            .find(|n| taken.binary_search(n).is_err())
            .unwrap_or(0);
        let path = self.slot_path(key, slot);
        let token = LockToken::generate();
        let metadata = LeaseMetadata::new(key, token.clone(), timeout)?;

        create_slot(&path, &metadata)?;
        Ok(Some(token))
    }

    fn refresh_lock_timeout(&self, key: &str, token: &LockToken, timeout: Duration) -> Result<()> {
        let _guard = self.guard(key)?;

        let Some((path, mut metadata)) = self.find_token(key, token)? else {
            return Err(GateError::LeaseLost(format!(
                "lock '{}' is not held by token {}",
                key, token
            )));
        };

        if metadata.is_expired() {
            return Err(GateError::LeaseLost(format!(
                "lease on '{}' expired before it was refreshed",
                key
            )));
        }

        metadata.renew(timeout)?;
        atomic_write(&path, metadata.to_json()?.as_bytes())
    }

    fn release_lock(&self, key: &str, token: &LockToken) -> Result<()> {
        let _guard = self
            .guard(key)
            .map_err(|e| GateError::ReleaseFailed(format!("lock '{}': {}", key, e)))?;

        let found = self
            .find_token(key, token)
            .map_err(|e| GateError::ReleaseFailed(format!("lock '{}': {}", key, e)))?;
        let Some((path, metadata)) = found else {
            return Err(GateError::ReleaseFailed(format!(
                "lock '{}' is not held by token {}",
                key, token
            )));
        };

        remove_slot(&path).map_err(|e| GateError::ReleaseFailed(e.to_string()))?;

        if metadata.is_expired() {
            return Err(GateError::ReleaseFailed(format!(
                "lease on '{}' expired before it was released",
                key
            )));
        }
        Ok(())
    }
}

/// Create a slot file exclusively and write its metadata.
fn create_slot(path: &Path, metadata: &LeaseMetadata) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                GateError::Lock(format!(
                    "slot '{}' was created outside the key guard",
                    path.display()
                ))
            } else {
                GateError::Lock(format!(
                    "failed to create lease file '{}': {}",
                    path.display(),
                    e
                ))
            }
        })?;

    let json = metadata.to_json()?;
    file.write_all(json.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|e| {
            // Clean up the slot on write failure
            let _ = fs::remove_file(path);
            GateError::Lock(format!("failed to write lease metadata: {}", e))
        })
}

fn remove_slot(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| {
        GateError::Lock(format!(
            "failed to remove lease file '{}': {}",
            path.display(),
            e
        ))
    })
}

fn file_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    SystemTime::now().duration_since(modified).ok()
}

pub(crate) fn validate_key(key: &str) -> Result<()> {
    if KEY_PATTERN.is_match(key) {
        Ok(())
    } else {
        Err(GateError::InvalidConfig(format!(
            "lock key '{}' must start with a letter or digit and contain only letters, digits, '.', '_' or '-'",
            key
        )))
    }
}

/// Split `job-A.0.lock` into `("job-A", 0)`.
fn parse_slot_file_name(path: &Path) -> Option<(String, u32)> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".lock")?;
    let (key, slot) = stem.rsplit_once('.')?;
    if !KEY_PATTERN.is_match(key) {
        return None;
    }
    let slot = slot.parse().ok()?;
    Some((key.to_string(), slot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slot_file_name() {
        assert_eq!(
            parse_slot_file_name(Path::new("/x/job-A.0.lock")),
            Some(("job-A".to_string(), 0))
        );
        assert_eq!(
            parse_slot_file_name(Path::new("nightly.v2.12.lock")),
            Some(("nightly.v2".to_string(), 12))
        );
        assert_eq!(parse_slot_file_name(Path::new("job-A.guard")), None);
        assert_eq!(parse_slot_file_name(Path::new(".job-A.0.lock.tmp")), None);
        assert_eq!(parse_slot_file_name(Path::new("job-A.x.lock")), None);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("job-A").is_ok());
        assert!(validate_key("reports.daily_1").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("has space").is_err());
    }
}
