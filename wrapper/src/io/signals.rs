//! Termination signal forwarding to the running optimizer.
//!
//! The batch platform stops a task by signalling the wrapper. The optimizer
//! must receive the same request instead of being orphaned, so the handler
//! relays SIGTERM to the tracked child and records that the task was
//! interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Shared {
    /// Pid of the running child, 0 when none. Held while signalling and while
    /// reaping, so a reaped (and possibly reused) pid is never signalled.
    child_pid: Mutex<u32>,
    received: AtomicBool,
}

/// Shared handle between the signal handler thread and the invoker.
#[derive(Debug, Clone, Default)]
pub struct SignalForwarder {
    shared: Arc<Shared>,
}

impl SignalForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the process-wide SIGINT/SIGTERM/SIGHUP handler.
    ///
    /// Can only succeed once per process.
    pub fn install(&self) -> Result<()> {
        let forwarder = self.clone();
        ctrlc::set_handler(move || forwarder.on_signal())
            .context("install termination signal handler")
    }

    /// Handle one termination request.
    pub fn on_signal(&self) {
        self.shared.received.store(true, Ordering::SeqCst);
        let pid = self.lock_pid();
        if *pid == 0 {
            warn!("termination requested before optimizer started");
            return;
        }
        warn!(pid = *pid, "termination requested, forwarding to optimizer");
        terminate(*pid);
    }

    /// True once any termination request arrived.
    pub fn received(&self) -> bool {
        self.shared.received.load(Ordering::SeqCst)
    }

    /// Track `pid` as the forwarding target until the guard drops.
    ///
    /// A request that arrived before the child existed is delivered now.
    pub fn track(&self, pid: u32) -> TrackedChild<'_> {
        let mut tracked = self.lock_pid();
        *tracked = pid;
        if self.received() {
            debug!(pid, "delivering termination requested before spawn");
            terminate(pid);
        }
        TrackedChild { forwarder: self }
    }

    /// Pid currently targeted by forwarding, if any.
    pub fn tracked_pid(&self) -> Option<u32> {
        let pid = *self.lock_pid();
        (pid != 0).then_some(pid)
    }

    fn lock_pid(&self) -> MutexGuard<'_, u32> {
        self.shared
            .child_pid
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Forwarding registration for one running child.
#[derive(Debug)]
pub struct TrackedChild<'a> {
    forwarder: &'a SignalForwarder,
}

impl TrackedChild<'_> {
    /// Run a wait step that may reap the child.
    ///
    /// The forwarding lock is held for the duration of `wait`, and the target
    /// is cleared before releasing it once `wait` reports an exit.
    pub fn reap_with<T, E>(
        &self,
        wait: impl FnOnce() -> Result<Option<T>, E>,
    ) -> Result<Option<T>, E> {
        let mut pid = self.forwarder.lock_pid();
        let result = wait();
        if matches!(result, Ok(Some(_))) {
            *pid = 0;
        }
        result
    }
}

impl Drop for TrackedChild<'_> {
    fn drop(&mut self) {
        *self.forwarder.lock_pid() = 0;
    }
}

#[cfg(unix)]
fn terminate(pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        warn!(pid, "pid out of range, cannot forward signal");
        return;
    };
    if let Err(err) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
        warn!(pid, err = %err, "failed to forward SIGTERM");
    }
}

#[cfg(not(unix))]
fn terminate(pid: u32) {
    // Console control events already reach every process attached to the console.
    debug!(pid, "relying on console to deliver termination");
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::Command;

    #[test]
    fn forwards_sigterm_to_tracked_child() {
        let forwarder = SignalForwarder::new();
        let mut child = Command::new("sleep").arg("30").spawn().expect("spawn sleep");
        let status = {
            let _tracked = forwarder.track(child.id());
            forwarder.on_signal();
            child.wait().expect("wait")
        };
        assert!(forwarder.received());
        assert_eq!(status.signal(), Some(libc_sigterm()));
    }

    #[test]
    fn early_request_is_delivered_on_track() {
        let forwarder = SignalForwarder::new();
        forwarder.on_signal();
        let mut child = Command::new("sleep").arg("30").spawn().expect("spawn sleep");
        let _tracked = forwarder.track(child.id());
        let status = child.wait().expect("wait");
        assert!(!status.success());
    }

    #[test]
    fn guard_clears_target() {
        let forwarder = SignalForwarder::new();
        {
            let _tracked = forwarder.track(4_000_000);
            assert_eq!(forwarder.tracked_pid(), Some(4_000_000));
        }
        assert_eq!(forwarder.tracked_pid(), None);
    }

    #[test]
    fn reaping_clears_target_before_guard_drops() {
        let forwarder = SignalForwarder::new();
        let mut child = Command::new("true").spawn().expect("spawn true");
        let tracked = forwarder.track(child.id());

        let status = tracked
            .reap_with(|| child.wait().map(Some))
            .expect("wait");
        assert!(status.is_some_and(|s| s.success()));
        assert_eq!(forwarder.tracked_pid(), None);

        // A late request must not reach the reaped pid.
        forwarder.on_signal();
        assert!(forwarder.received());
    }

    #[test]
    fn pending_wait_keeps_target() {
        let forwarder = SignalForwarder::new();
        let tracked = forwarder.track(4_000_000);
        let polled: Result<Option<()>, ()> = tracked.reap_with(|| Ok(None));
        assert_eq!(polled, Ok(None));
        assert_eq!(forwarder.tracked_pid(), Some(4_000_000));
    }

    fn libc_sigterm() -> i32 {
        nix::sys::signal::Signal::SIGTERM as i32
    }
}
