//! Task index handling and the per-index file layout.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::TaskError;

/// Index assigned to this process by the batch platform.
///
/// Opaque token: only ever substituted into file name templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TaskIndex(String);

impl TaskIndex {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input and result artifact paths for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPaths {
    /// `<share_root>/inputs/config_<index>.json`
    pub input: PathBuf,
    /// `<share_root>/outputs/result_<index>.json`
    pub result: PathBuf,
}

impl TaskPaths {
    /// Substitute `index` into the fixed templates. No filesystem access.
    pub fn resolve(share_root: &Path, index: &TaskIndex) -> Self {
        Self {
            input: share_root
                .join("inputs")
                .join(format!("config_{index}.json")),
            result: share_root
                .join("outputs")
                .join(format!("result_{index}.json")),
        }
    }
}

/// Read the task index from `var` via `lookup`.
///
/// Absent or blank values are fatal, as are tokens that would escape the
/// `inputs/` or `outputs/` directory once substituted.
pub fn read_task_index<F>(var: &str, lookup: F) -> Result<TaskIndex, TaskError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(var).unwrap_or_default();
    let token = raw.trim();
    if token.is_empty() {
        return Err(TaskError::IndexAbsent {
            var: var.to_string(),
        });
    }
    if token == "." || token == ".." || token.contains(['/', '\\']) {
        return Err(TaskError::IndexMalformed {
            var: var.to_string(),
            index: token.to_string(),
        });
    }
    Ok(TaskIndex::new(token))
}
