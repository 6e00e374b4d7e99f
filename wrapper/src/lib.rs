//! Array-job wrapper around a single-node optimization binary.
//!
//! One process handles one task index assigned by the batch platform. The
//! index picks the input/result file pair, optimizer parameters come from the
//! environment, the optimizer runs as a child process, and its single JSON
//! output is copied to the task's result path.
//!
//! - **[`core`]**: Pure, deterministic logic (path templates, parameter
//!   resolution, result cardinality). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config file, processes, signals,
//!   filesystem copy).
//!
//! [`pipeline`] composes both into the `run` and `plan` commands.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
