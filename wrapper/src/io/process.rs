//! Run a child process with inherited stdio and an optional timeout.

use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use super::signals::{SignalForwarder, TrackedChild};
use crate::error::TaskError;

/// Upper bound on a single wait step, and so on how long signal forwarding
/// may be held back by a wait in progress.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a child process ended.
#[derive(Debug)]
pub struct RunOutcome {
    pub status: ExitStatus,
    /// The timeout elapsed and the child was killed.
    pub timed_out: bool,
    /// A termination signal was forwarded while the child ran.
    pub interrupted: bool,
}

/// Spawn `cmd` and block until it exits.
///
/// stdout/stderr stay attached to the wrapper's own streams so the optimizer's
/// output lands in the task log unmodified. Without a timeout the wait is
/// unbounded; the platform's own task timeout is then the only limit.
#[instrument(skip_all, fields(timeout_secs = timeout.map(|t| t.as_secs())))]
pub fn run_inherited(
    mut cmd: Command,
    timeout: Option<Duration>,
    signals: Option<&SignalForwarder>,
) -> Result<RunOutcome, TaskError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(TaskError::Spawn {
                binary: cmd.get_program().into(),
                source: e,
            });
        }
    };

    let tracked = signals.map(|s| s.track(child.id()));
    let (status, timed_out) = wait_child(&mut child, timeout, tracked.as_ref())?;
    drop(tracked);

    let interrupted = signals.is_some_and(SignalForwarder::received);
    debug!(exit_code = ?status.code(), timed_out, interrupted, "command finished");
    Ok(RunOutcome {
        status,
        timed_out,
        interrupted,
    })
}

/// Wait for `child` in bounded steps, killing it once `timeout` elapses.
///
/// Every step that can reap the child runs through `tracked`, so forwarding
/// stops in the same critical section that reaps the pid.
fn wait_child(
    child: &mut Child,
    timeout: Option<Duration>,
    tracked: Option<&TrackedChild<'_>>,
) -> Result<(ExitStatus, bool), TaskError> {
    let deadline = timeout.map(|limit| Instant::now() + limit);
    loop {
        let step = deadline.map_or(POLL_INTERVAL, |d| {
            d.saturating_duration_since(Instant::now()).min(POLL_INTERVAL)
        });
        let polled = match tracked {
            Some(t) => t.reap_with(|| child.wait_timeout(step)),
            None => child.wait_timeout(step),
        }
        .map_err(|source| TaskError::Wait { source })?;
        if let Some(status) = polled {
            return Ok((status, false));
        }

        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            warn!(
                timeout_secs = timeout.unwrap_or_default().as_secs(),
                "command timed out, killing"
            );
            child.kill().map_err(|source| TaskError::Wait { source })?;
            let reaped = match tracked {
                Some(t) => t.reap_with(|| child.wait().map(Some)),
                None => child.wait().map(Some),
            }
            .map_err(|source| TaskError::Wait { source })?;
            if let Some(status) = reaped {
                return Ok((status, true));
            }
        }
    }
}
