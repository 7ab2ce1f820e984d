//! Settings struct definition and defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "semgate.yaml";

/// Settings for the semgate CLI.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the lease files shared by every contender.
    pub lock_dir: PathBuf,

    /// Lease timeout used when `run` is not given `--timeout`.
    pub default_lock_timeout_secs: u64,

    /// Holder capacity used when `run` is not given `--max-holders`.
    pub default_max_lock_count: u32,

    /// How often `run` checks on its child process and signals progress.
    pub poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lock_dir: default_lock_dir(),
            default_lock_timeout_secs: 60,
            default_max_lock_count: 1,
            poll_interval_ms: 1000,
        }
    }
}

fn default_lock_dir() -> PathBuf {
    PathBuf::from(".semgate").join("locks")
}
