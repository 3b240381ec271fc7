//! Copying image steps into the managed images directory.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::{debug, warn};

use crate::{Action, ActionKind, Error, Result};

/// True if `path` already lives inside `dir`.
fn is_managed(dir: &Path, path: &Path) -> bool {
    match (fs::canonicalize(dir), fs::canonicalize(path)) {
        (Ok(dir), Ok(path)) => path.starts_with(dir),
        _ => false,
    }
}

/// Free managed path: `<unix-epoch-seconds>_<original-basename>`, or
/// `<secs>_<stem>_<n>.<ext>` with the first free `n` when that name is taken.
fn managed_dest(dir: &Path, src: &Path, now: SystemTime) -> Option<PathBuf> {
    let base = src.file_name()?.to_string_lossy().into_owned();
    let secs = now.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    let first = dir.join(format!("{secs}_{base}"));
    if !first.exists() {
        return Some(first);
    }
    let stem = src
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| base.clone());
    let ext = src
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1u32..)
        .map(|n| dir.join(format!("{secs}_{stem}_{n}{ext}")))
        .find(|p| !p.exists())
}

/// Copy one file into `dir`, returning the destination.
fn copy_into(dir: &Path, src: &Path, now: SystemTime) -> Result<PathBuf> {
    let err = |message: String| Error::Image {
        path: src.to_path_buf(),
        message,
    };
    fs::create_dir_all(dir).map_err(|e| err(e.to_string()))?;
    let dest = managed_dest(dir, src, now).ok_or_else(|| err("path has no file name".into()))?;
    fs::copy(src, &dest).map_err(|e| err(e.to_string()))?;
    Ok(dest)
}

/// Import every external image step into `dir`, rewriting the step's value.
///
/// Steps whose file is missing or already managed are left alone. A failed
/// copy is logged and keeps the original path. Returns the new paths.
pub(crate) fn import_images(dir: &Path, actions: &mut [Action], now: SystemTime) -> Vec<PathBuf> {
    let mut imported = Vec::new();
    for (index, action) in actions.iter_mut().enumerate() {
        if action.kind != ActionKind::Image {
            continue;
        }
        let src = PathBuf::from(&action.value);
        if !src.is_file() || is_managed(dir, &src) {
            continue;
        }
        match copy_into(dir, &src, now) {
            Ok(dest) => {
                debug!(index, from = %src.display(), to = %dest.display(), "image_imported");
                action.value = dest.to_string_lossy().into_owned();
                imported.push(dest);
            }
            Err(e) => warn!(index, error = %e, "image_import_failed"),
        }
    }
    imported
}
