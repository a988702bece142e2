// src/exec/backend.rs

//! Pluggable job runner abstraction.
//!
//! The Supervisor and the completion-signal writer talk to a `JobRunner`
//! instead of calling [`run_job`] directly. Production code uses
//! [`CommandRunner`]; tests can provide a runner that returns canned
//! records without spawning anything.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::errors::Result;
use crate::exec::runner::{JobOutcome, JobRequest, run_job};
use crate::record::CompletionRecord;

pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<JobOutcome>> + Send + 'a>>;

/// Trait abstracting how a job is executed.
pub trait JobRunner: Send + Sync {
    /// Run the job and resolve once it has exited and its output is final.
    fn execute<'a>(&'a self, request: &'a JobRequest) -> RunFuture<'a>;
}

/// Real runner: spawns an OS process.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner;

impl CommandRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `command_line` (split on whitespace, no shell) in `work_dir`.
    pub async fn run(&self, command_line: &str, work_dir: &Path) -> Result<CompletionRecord> {
        let request = JobRequest::new(command_line, work_dir);
        Ok(self.execute(&request).await?.record)
    }
}

impl JobRunner for CommandRunner {
    fn execute<'a>(&'a self, request: &'a JobRequest) -> RunFuture<'a> {
        Box::pin(run_job(request))
    }
}
