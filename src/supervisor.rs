// src/supervisor.rs

//! Supervisor: run a job and notify about it from the same process.

use tracing::info;

use crate::config::model::DEFAULT_TAIL_LINES;
use crate::errors::Result;
use crate::exec::{JobOutcome, JobRequest, JobRunner};
use crate::notify::{Channel, DeliveryOutcome, deliver_with_fallback};
use crate::report;

/// A job run together with what happened to its report.
#[derive(Debug)]
pub struct SupervisedRun {
    pub outcome: JobOutcome,
    pub delivery: DeliveryOutcome,
}

impl SupervisedRun {
    /// The job's own exit code. Delivery has no say in it.
    pub fn return_code(&self) -> i32 {
        self.outcome.record.return_code()
    }
}

pub struct Supervisor {
    runner: Box<dyn JobRunner>,
    primary: Box<dyn Channel>,
    fallback: Box<dyn Channel>,
    tail_lines: usize,
}

impl Supervisor {
    pub fn new(
        runner: Box<dyn JobRunner>,
        primary: Box<dyn Channel>,
        fallback: Box<dyn Channel>,
    ) -> Self {
        Self {
            runner,
            primary,
            fallback,
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }

    /// Number of trailing output lines appended to the report. 0 disables.
    pub fn with_tail_lines(mut self, n: usize) -> Self {
        self.tail_lines = n;
        self
    }

    /// Run `request`, then deliver the report with local fallback.
    ///
    /// Only a spawn failure is an error. A failing job and a failing
    /// notification are both data on the returned [`SupervisedRun`].
    pub async fn run(&self, request: &JobRequest) -> Result<SupervisedRun> {
        let outcome = self.runner.execute(request).await?;

        let message = report::markdown_with_tail(&outcome.record, outcome.tail(self.tail_lines));
        let delivery =
            deliver_with_fallback(self.primary.as_ref(), self.fallback.as_ref(), &message).await;

        info!(
            exit_code = outcome.record.return_code(),
            delivered = delivery.reached_someone(),
            "job supervised"
        );

        Ok(SupervisedRun { outcome, delivery })
    }
}
