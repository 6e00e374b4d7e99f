//! I/O adapters for wrapper commands.

use std::ffi::OsString;

use crate::error::TaskError;

pub mod collect;
pub mod config;
pub mod invoker;
pub mod process;
pub mod signals;

/// Environment lookup backed by the real process environment.
///
/// Non-UTF-8 values read as unset here; [`require_unicode`] rejects them
/// before any lookup happens.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Fail on the first of `vars` that is set but not valid UTF-8.
///
/// The wrapper passes values through verbatim, so it refuses to run rather
/// than fall back to a default for a value it cannot represent.
pub fn require_unicode<F>(vars: &[&str], lookup: F) -> Result<(), TaskError>
where
    F: Fn(&str) -> Option<OsString>,
{
    for var in vars {
        if let Some(value) = lookup(var)
            && value.to_str().is_none()
        {
            return Err(TaskError::EnvNotUnicode {
                var: (*var).to_string(),
            });
        }
    }
    Ok(())
}
