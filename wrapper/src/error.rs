//! Failure taxonomy for a single task execution.
//!
//! Every variant is fatal: the pipeline stops at the first error and the
//! process exits with [`TaskError::exit_code`].

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::exit_codes;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task index variable {var} is not set or empty")]
    IndexAbsent { var: String },

    #[error("task index {index:?} from {var} is not a usable file name token")]
    IndexMalformed { var: String, index: String },

    #[error("environment variable {var} is not valid unicode")]
    EnvNotUnicode { var: String },

    #[error("input artifact {} does not exist", .path.display())]
    InputMissing { path: PathBuf },

    #[error("spawn optimizer {}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("wait for optimizer")]
    Wait {
        #[source]
        source: std::io::Error,
    },

    #[error("optimizer failed with {}", describe_code(.code.as_ref()))]
    SubprocessFailed { code: Option<i32> },

    #[error("optimizer timed out after {}s", .after.as_secs())]
    TimedOut { after: Duration },

    #[error("interrupted by termination signal")]
    Interrupted,

    #[error(
        "expected exactly one json output in {}, found {}{}",
        .dir.display(),
        .found.len(),
        list_paths(.found.as_slice())
    )]
    ResultAmbiguity { dir: PathBuf, found: Vec<PathBuf> },

    #[error("list optimizer outputs in {}", .dir.display())]
    ListOutput {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("copy {} to {}", .from.display(), .to.display())]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TaskError {
    /// Process exit code reported to the batch platform.
    pub fn exit_code(&self) -> i32 {
        match self {
            TaskError::IndexAbsent { .. }
            | TaskError::IndexMalformed { .. }
            | TaskError::EnvNotUnicode { .. }
            | TaskError::InputMissing { .. }
            | TaskError::Spawn { .. } => exit_codes::INVALID,
            TaskError::Wait { .. } | TaskError::SubprocessFailed { .. } => {
                exit_codes::SUBPROCESS_FAILED
            }
            TaskError::TimedOut { .. } => exit_codes::TIMED_OUT,
            TaskError::Interrupted => exit_codes::INTERRUPTED,
            TaskError::ResultAmbiguity { .. } => exit_codes::RESULT_AMBIGUOUS,
            TaskError::ListOutput { .. } | TaskError::CopyFailed { .. } => exit_codes::COPY_FAILED,
        }
    }
}

fn describe_code(code: Option<&i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (killed by signal)".to_string(),
    }
}

fn list_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return String::new();
    }
    let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!(": {}", names.join(", "))
}
