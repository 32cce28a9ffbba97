//! Profiling passes over the `ckinstr` IR.
//!
//! Two independent module transformations are provided:
//!
//! - [`checkpoint::CheckpointPass`] instruments every exported function with
//!   calls to an external profiling runtime on entry and exit, and wraps the
//!   program entry with the runtime's initialize/finalize hooks;
//! - [`makecalls::MakecallsPass`] synthesizes a driver calling a single
//!   integer function over a sampled range of arguments.
//!
//! Passes are scheduled with [`pass::PassManager`] and configured through
//! [`config::PassConfig`].

pub mod checkpoint;
pub mod config;
pub mod locate;
pub mod magic;
pub mod makecalls;
pub mod pass;
#[cfg(any(test, feature = "test-utils"))]
pub mod tests_utils;
pub mod utils;
