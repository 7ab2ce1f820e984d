//! Atomic replacement of slot files.
//!
//! Content is written to `.{filename}.tmp` in the same directory, synced,
//! and renamed over the target. `rename` is atomic when source and target
//! share a filesystem, so a reader sees either the old lease or the new one.

use crate::error::{GateError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub(super) fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = temp_path_for(path)?;

    let mut file = File::create(&temp_path).map_err(|e| {
        GateError::Lock(format!(
            "failed to create temporary file '{}': {}",
            temp_path.display(),
            e
        ))
    })?;

    file.write_all(content)
        .and_then(|_| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            GateError::Lock(format!(
                "failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        GateError::Lock(format!(
            "failed to replace '{}': {}",
            path.display(),
            e
        ))
    })
}

fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| GateError::Lock(format!("invalid lock path '{}'", target.display())))?;

    Ok(parent.join(format!(".{}.tmp", filename)))
}
