//! File operations used by sync runs
//!
//! Every write of a working file, blob or state file goes through
//! [`write_atomic`], so an interrupted run leaves either the old or the new
//! content on disk and never a truncated file.

use crate::{Error, NormalizedPath, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Write `content` to a locked temp sibling, then rename it over `path`.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let target = path.to_native();
    ensure_parent(&target)?;

    let temp = temp_sibling(&target);
    if let Err(error) = fill_locked(&temp, &target, content) {
        let _ = fs::remove_file(&temp);
        return Err(error);
    }
    fs::rename(&temp, &target).map_err(|e| {
        let _ = fs::remove_file(&temp);
        Error::io(&target, e)
    })
}

fn fill_locked(temp: &Path, target: &Path, content: &[u8]) -> Result<()> {
    let mut file: File = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp)
        .map_err(|e| Error::io(temp, e))?;
    file.lock_exclusive()
        .map_err(|_| Error::LockFailed { path: target.to_path_buf() })?;

    let written = file
        .write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| Error::io(temp, e));
    let _ = FileExt::unlock(&file);
    written
}

// Same directory keeps the rename on one filesystem.
fn temp_sibling(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

fn ensure_parent(target: &Path) -> Result<()> {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))
        }
        _ => Ok(()),
    }
}

pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native = path.to_native();
    fs::read_to_string(&native).map_err(|e| Error::io(native, e))
}

pub fn read_bytes(path: &NormalizedPath) -> Result<Vec<u8>> {
    let native = path.to_native();
    fs::read(&native).map_err(|e| Error::io(native, e))
}

/// Like [`read_text`], with a missing file as `None`.
pub fn read_text_opt(path: &NormalizedPath) -> Result<Option<String>> {
    let native = path.to_native();
    match fs::read_to_string(&native) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(native, e)),
    }
}

/// Rename a file or directory tree, creating the destination's parents.
/// An existing destination is never overwritten.
pub fn move_path(from: &NormalizedPath, to: &NormalizedPath) -> Result<()> {
    let (src, dst) = (from.to_native(), to.to_native());
    if dst.exists() {
        return Err(Error::DestinationExists { from: src, to: dst });
    }
    ensure_parent(&dst)?;
    fs::rename(&src, &dst).map_err(|e| Error::io(src, e))
}

/// Delete a file. Already gone counts as success.
pub fn remove_file(path: &NormalizedPath) -> Result<()> {
    let native = path.to_native();
    match fs::remove_file(&native) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(Error::io(native, e)),
        _ => Ok(()),
    }
}

/// Walk up from `dir` removing empty directories. `stop` and anything
/// outside it are never removed.
pub fn prune_empty_dirs(dir: &NormalizedPath, stop: &NormalizedPath) {
    let mut current = Some(dir.clone());
    while let Some(path) = current.take() {
        if path.relative_to(stop).is_none_or(|relative| relative.is_empty()) {
            return;
        }
        let empty = fs::read_dir(path.to_native())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !empty || fs::remove_dir(path.to_native()).is_err() {
            return;
        }
        tracing::debug!(dir = %path, "Pruned empty directory");
        current = path.parent();
    }
}
