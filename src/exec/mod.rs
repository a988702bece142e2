// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] turns a configured command into an argv (no shell, Python
//!   unbuffered-output normalisation).
//! - [`log_sink`] owns the captured output: console echo, bounded memory
//!   window, and the optional log file with header and trailer.
//! - [`runner`] spawns the child, drains its merged output, waits for exit
//!   and builds the `CompletionRecord`.
//! - [`backend`] provides the `JobRunner` trait and the concrete
//!   `CommandRunner`, which tests can replace with a fake.

pub mod backend;
pub mod command;
pub mod log_sink;
pub mod runner;

pub use backend::{CommandRunner, JobRunner, RunFuture};
pub use runner::{JobOutcome, JobRequest, run_job};
