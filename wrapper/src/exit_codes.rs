//! Stable exit codes for wrapper CLI commands.

/// Pipeline succeeded and the result artifact was delivered.
pub const OK: i32 = 0;
/// Invalid configuration, missing task index or input, or optimizer not startable.
pub const INVALID: i32 = 1;
/// Optimizer exited non-zero or was killed by a signal.
pub const SUBPROCESS_FAILED: i32 = 2;
/// Optimizer exceeded the configured timeout and was killed.
pub const TIMED_OUT: i32 = 3;
/// Optimizer produced zero or several JSON outputs.
pub const RESULT_AMBIGUOUS: i32 = 4;
/// Output listing or result copy failed.
pub const COPY_FAILED: i32 = 5;
/// Wrapper received a termination signal and forwarded it to the optimizer.
pub const INTERRUPTED: i32 = 130;
