//! Orchestration for one array task: resolve, invoke, collect.
//!
//! Each stage gates the next and the first failure aborts the task. Nothing
//! is retried here; retries are the batch platform's business.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{Span, field, info, instrument};

use crate::core::collect::select_single;
use crate::core::params::ParameterSet;
use crate::core::task::{TaskIndex, TaskPaths, read_task_index};
use crate::error::TaskError;
use crate::io::collect::{copy_atomic, list_candidates};
use crate::io::config::WrapperConfig;
use crate::io::invoker::{InvocationOutcome, InvokeRequest, Invoker};

/// Settings for a single task, independent of where they were loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSettings {
    pub share_root: PathBuf,
    pub workdir: PathBuf,
    /// Optimizer output directory, relative to `workdir` unless absolute.
    pub output_dir: PathBuf,
    pub binary: PathBuf,
    pub index_var: String,
    pub timeout: Option<Duration>,
}

impl From<&WrapperConfig> for TaskSettings {
    fn from(cfg: &WrapperConfig) -> Self {
        Self {
            share_root: cfg.share_root.clone(),
            workdir: cfg.workdir.clone(),
            output_dir: cfg.output_dir.clone(),
            binary: cfg.binary.clone(),
            index_var: cfg.index_var.clone(),
            timeout: cfg.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Everything resolved before the optimizer starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPlan {
    pub index: TaskIndex,
    #[serde(flatten)]
    pub paths: TaskPaths,
    pub output_dir: PathBuf,
    pub params: ParameterSet,
    pub argv: Vec<String>,
    pub timeout_secs: Option<u64>,
    #[serde(skip)]
    pub request: InvokeRequest,
}

/// The delivered result artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub index: TaskIndex,
    /// Optimizer output that was copied.
    pub source: PathBuf,
    pub result: PathBuf,
    pub bytes: u64,
}

/// Resolve index, paths, and parameters. No filesystem access, no process.
pub fn plan_task<F>(settings: &TaskSettings, lookup: F) -> Result<TaskPlan, TaskError>
where
    F: Fn(&str) -> Option<String>,
{
    let index = read_task_index(&settings.index_var, &lookup)?;
    let paths = TaskPaths::resolve(&settings.share_root, &index);
    let params = ParameterSet::resolve(&lookup);
    let request = InvokeRequest {
        binary: settings.binary.clone(),
        workdir: settings.workdir.clone(),
        input: paths.input.clone(),
        params: params.clone(),
        timeout: settings.timeout,
    };
    Ok(TaskPlan {
        index,
        output_dir: settings.workdir.join(&settings.output_dir),
        argv: request.argv(),
        timeout_secs: settings.timeout.map(|t| t.as_secs()),
        paths,
        params,
        request,
    })
}

/// Run the whole task: plan, check input, invoke the optimizer, collect its result.
#[instrument(skip_all, fields(index = field::Empty))]
pub fn run_task<F, I>(
    settings: &TaskSettings,
    lookup: F,
    invoker: &I,
) -> Result<TaskReport, TaskError>
where
    F: Fn(&str) -> Option<String>,
    I: Invoker,
{
    let plan = plan_task(settings, lookup)?;
    Span::current().record("index", plan.index.as_str());
    info!(
        index = %plan.index,
        input = %plan.paths.input.display(),
        result = %plan.paths.result.display(),
        "resolved task paths"
    );

    if !plan.paths.input.is_file() {
        return Err(TaskError::InputMissing {
            path: plan.paths.input.clone(),
        });
    }

    match invoker.invoke(&plan.request)? {
        InvocationOutcome::Succeeded => {}
        InvocationOutcome::Failed { code } => return Err(TaskError::SubprocessFailed { code }),
        InvocationOutcome::TimedOut { after } => return Err(TaskError::TimedOut { after }),
        InvocationOutcome::Interrupted => return Err(TaskError::Interrupted),
    }

    let candidates = list_candidates(&plan.output_dir)?;
    let source = select_single(&plan.output_dir, candidates)?;
    let bytes = copy_atomic(&source, &plan.paths.result)?;
    info!(
        source = %source.display(),
        result = %plan.paths.result.display(),
        bytes,
        "delivered result artifact"
    );

    Ok(TaskReport {
        index: plan.index,
        source,
        result: plan.paths.result,
        bytes,
    })
}
