//! Invoker abstraction for the optimization binary.
//!
//! The [`Invoker`] trait decouples the pipeline from actually spawning the
//! optimizer. Tests use scripted invokers that drop chosen files into the
//! output directory without starting a process.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tracing::{info, instrument, warn};

use super::process::run_inherited;
use super::signals::SignalForwarder;
use crate::core::params::ParameterSet;
use crate::error::TaskError;

/// Parameters for one optimizer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    /// Optimizer executable.
    pub binary: PathBuf,
    /// Working directory the optimizer runs in (its `output/` lives here).
    pub workdir: PathBuf,
    /// Input artifact passed with `-i`.
    pub input: PathBuf,
    pub params: ParameterSet,
    /// Kill the optimizer after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl InvokeRequest {
    /// Arguments after the binary: `-i <input> -s <seed> -e <explore> -c <compress>`.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-i".to_string(), self.input.display().to_string()];
        args.extend(self.params.to_args());
        args
    }

    /// Full command line, binary first.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.binary.display().to_string()];
        argv.extend(self.args());
        argv
    }
}

/// How the optimizer run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOutcome {
    Succeeded,
    /// Non-zero exit. `code` is `None` when killed by a signal.
    Failed { code: Option<i32> },
    TimedOut { after: Duration },
    /// The wrapper was asked to terminate and relayed it to the optimizer.
    Interrupted,
}

/// Abstraction over optimizer execution.
pub trait Invoker {
    /// Run the optimizer to completion. Spawn and wait errors are returned as `Err`;
    /// how the process ended is reported as an [`InvocationOutcome`].
    fn invoke(&self, request: &InvokeRequest) -> Result<InvocationOutcome, TaskError>;
}

/// Invoker that spawns the real optimization binary.
#[derive(Debug, Clone, Default)]
pub struct OptimizerInvoker {
    signals: Option<SignalForwarder>,
}

impl OptimizerInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward termination requests received by `signals` to the optimizer.
    pub fn with_signals(mut self, signals: SignalForwarder) -> Self {
        self.signals = Some(signals);
        self
    }
}

impl Invoker for OptimizerInvoker {
    #[instrument(skip_all, fields(binary = %request.binary.display()))]
    fn invoke(&self, request: &InvokeRequest) -> Result<InvocationOutcome, TaskError> {
        info!(argv = ?request.argv(), workdir = %request.workdir.display(), "starting optimizer");
        let mut cmd = Command::new(&request.binary);
        cmd.arg("-i")
            .arg(&request.input)
            .args(request.params.to_args())
            .current_dir(&request.workdir);

        let outcome = run_inherited(cmd, request.timeout, self.signals.as_ref())?;

        if outcome.interrupted {
            warn!(exit_code = ?outcome.status.code(), "optimizer stopped after termination request");
            return Ok(InvocationOutcome::Interrupted);
        }
        if outcome.timed_out {
            let after = request.timeout.unwrap_or_default();
            warn!(timeout_secs = after.as_secs(), "optimizer timed out");
            return Ok(InvocationOutcome::TimedOut { after });
        }
        if !outcome.status.success() {
            warn!(exit_code = ?outcome.status.code(), "optimizer failed");
            return Ok(InvocationOutcome::Failed {
                code: outcome.status.code(),
            });
        }
        info!("optimizer completed successfully");
        Ok(InvocationOutcome::Succeeded)
    }
}
