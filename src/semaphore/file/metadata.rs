//! Lease metadata stored in slot files.

use crate::error::{GateError, Result};
use crate::semaphore::LockToken;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Lease metadata stored in a slot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseMetadata {
    /// Token proving ownership of this lease.
    pub token: LockToken,

    /// The lock key this lease belongs to.
    pub key: String,

    /// Owner of the lease (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the lease holder (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// When the lease was first granted (RFC3339).
    pub acquired_at: DateTime<Utc>,

    /// When the lease lapses unless refreshed (RFC3339).
    pub expires_at: DateTime<Utc>,
}

impl LeaseMetadata {
    /// Create metadata for a lease granted now.
    pub fn new(key: &str, token: LockToken, timeout: std::time::Duration) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            token,
            key: key.to_string(),
            owner: get_owner_string(),
            pid: Some(std::process::id()),
            acquired_at: now,
            expires_at: deadline_after(now, timeout)?,
        })
    }

    /// Parse lease metadata from a slot file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            GateError::Lock(format!(
                "failed to read lease file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            GateError::Lock(format!(
                "failed to parse lease file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Serialize lease metadata to JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GateError::Lock(format!("failed to serialize lease metadata: {}", e)))
    }

    /// Push the expiry to `timeout` from now.
    pub fn renew(&mut self, timeout: std::time::Duration) -> Result<()> {
        self.expires_at = deadline_after(Utc::now(), timeout)?;
        Ok(())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Time left before the lease lapses; negative once expired.
    pub fn remaining(&self) -> Duration {
        self.expires_at.signed_duration_since(Utc::now())
    }

    /// Calculate the age of the lease.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.acquired_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        format_duration(self.age())
    }

    /// Format the remaining time as a human-readable string.
    pub fn remaining_string(&self) -> String {
        let remaining = self.remaining();
        if remaining <= Duration::zero() {
            "0s".to_string()
        } else {
            format_duration(remaining)
        }
    }
}

fn format_duration(d: Duration) -> String {
    let seconds = d.num_seconds();
    let minutes = d.num_minutes();
    let hours = d.num_hours();
    let days = d.num_days();

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

fn deadline_after(now: DateTime<Utc>, timeout: std::time::Duration) -> Result<DateTime<Utc>> {
    Duration::from_std(timeout)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| {
            GateError::InvalidConfig(format!(
                "lease timeout of {}s is out of range",
                timeout.as_secs()
            ))
        })
}

/// Get the owner string for lease metadata.
pub(crate) fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_creation() {
        let meta =
            LeaseMetadata::new("job-A", LockToken::new("t1"), std::time::Duration::from_secs(9))
                .unwrap();

        assert_eq!(meta.key, "job-A");
        assert_eq!(meta.token.as_str(), "t1");
        assert!(meta.pid.is_some());
        assert!(meta.owner.contains('@'));
        assert!(!meta.is_expired());
        assert!(meta.remaining() <= Duration::seconds(9));
        assert!(meta.remaining() > Duration::seconds(8));
    }

    #[test]
    fn test_metadata_serialization() {
        let meta =
            LeaseMetadata::new("job-A", LockToken::new("t1"), std::time::Duration::from_secs(9))
                .unwrap();
        let json = meta.to_json().unwrap();

        assert!(json.contains("\"token\": \"t1\""));
        assert!(json.contains("expires_at"));

        let parsed: LeaseMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.token, meta.token);
        assert_eq!(parsed.expires_at, meta.expires_at);
    }

    #[test]
    fn test_renew_resets_expiry() {
        let mut meta =
            LeaseMetadata::new("job-A", LockToken::new("t1"), std::time::Duration::from_secs(9))
                .unwrap();
        meta.expires_at = Utc::now() - Duration::seconds(1);
        assert!(meta.is_expired());

        meta.renew(std::time::Duration::from_secs(60)).unwrap();
        assert!(!meta.is_expired());
        assert!(meta.remaining() > Duration::seconds(50));
    }

    #[test]
    fn test_out_of_range_timeout_is_rejected() {
        let huge = std::time::Duration::from_secs(5_000_000_000_000_000);

        let err = LeaseMetadata::new("job-A", LockToken::new("t1"), huge).unwrap_err();
        assert!(matches!(err, GateError::InvalidConfig(_)));

        let mut meta =
            LeaseMetadata::new("job-A", LockToken::new("t1"), std::time::Duration::from_secs(9))
                .unwrap();
        let before = meta.expires_at;
        assert!(meta.renew(huge).is_err());
        assert_eq!(meta.expires_at, before);
    }

    #[test]
    fn test_duration_strings() {
        let mut meta =
            LeaseMetadata::new("job-A", LockToken::new("t1"), std::time::Duration::from_secs(9))
                .unwrap();
        assert!(meta.age_string().ends_with('s'));

        meta.acquired_at = Utc::now() - Duration::hours(2);
        assert!(meta.age_string().contains('h'));

        meta.acquired_at = Utc::now() - Duration::days(3);
        assert!(meta.age_string().contains('d'));

        meta.expires_at = Utc::now() - Duration::seconds(5);
        assert_eq!(meta.remaining_string(), "0s");
    }

    #[test]
    fn test_get_owner_string() {
        let owner = get_owner_string();
        assert!(owner.contains('@'));
    }
}
