//! Deterministic, pure logic shared by the wrapper.
//!
//! Core modules must be free of I/O side effects. Environment access is
//! injected as a lookup closure so every rule is testable without touching
//! the real process environment.

pub mod collect;
pub mod params;
pub mod task;
