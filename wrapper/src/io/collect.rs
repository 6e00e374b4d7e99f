//! Listing optimizer outputs and delivering the result artifact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::TaskError;

/// JSON files directly inside `dir`, sorted by path.
///
/// Matches what `dir/*.json` expands to: hidden files are skipped. A missing
/// directory means the optimizer produced nothing. Files in `dir` are only
/// read, never moved or deleted.
pub fn list_candidates(dir: &Path) -> Result<Vec<PathBuf>, TaskError> {
    let list_err = |source| TaskError::ListOutput {
        dir: dir.to_path_buf(),
        source,
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "output directory missing");
            return Ok(Vec::new());
        }
        Err(e) => return Err(list_err(e)),
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(list_err)?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    debug!(dir = %dir.display(), count = found.len(), "listed optimizer outputs");
    Ok(found)
}

/// Copy `from` to `to` byte-for-byte through a sibling temp file and rename.
///
/// `to` either keeps its previous state or holds the complete copy. Returns
/// the number of bytes copied.
pub fn copy_atomic(from: &Path, to: &Path) -> Result<u64, TaskError> {
    let copy_err = |source| TaskError::CopyFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    let parent = to.parent().unwrap_or_else(|| Path::new(""));
    fs::create_dir_all(parent).map_err(copy_err)?;

    let file_name = to
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = parent.join(format!(".{file_name}.{}.tmp", std::process::id()));

    let copied = fs::copy(from, &tmp_path)
        .and_then(|bytes| fs::File::open(&tmp_path)?.sync_all().map(|()| bytes))
        .and_then(|bytes| fs::rename(&tmp_path, to).map(|()| bytes));
    match copied {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&tmp_path)
                && cleanup.kind() != ErrorKind::NotFound
            {
                warn!(path = %tmp_path.display(), err = %cleanup, "failed to remove temp result");
            }
            Err(copy_err(e))
        }
    }
}
