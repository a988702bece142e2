use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use jobnotify::errors::JobNotifyError;
use jobnotify::exec::{JobOutcome, JobRequest, JobRunner, RunFuture};
use jobnotify::notify::{Channel, DeliverFuture};
use jobnotify::record::Pid;

use crate::builders::RecordBuilder;

/// A channel that records every report it is handed.
///
/// Clones share the log, so a test can keep one handle and box another.
#[derive(Debug, Clone, Default)]
pub struct FakeChannel {
    delivered: Arc<Mutex<Vec<String>>>,
    attempts: Arc<Mutex<usize>>,
    failure: Option<String>,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose every delivery fails with `DeliveryError(reason)`.
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Successfully delivered reports, in order.
    pub fn deliveries(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }

    /// Delivery attempts, successful or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

impl Channel for FakeChannel {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn deliver<'a>(&'a self, markdown: &'a str) -> DeliverFuture<'a> {
        *self.attempts.lock().unwrap() += 1;
        let result = match &self.failure {
            Some(reason) => Err(JobNotifyError::DeliveryError(reason.clone())),
            None => {
                self.delivered.lock().unwrap().push(markdown.to_string());
                Ok(())
            }
        };
        Box::pin(async move { result })
    }
}

/// In-memory `Write` target whose clones share one buffer. Hand one clone
/// to `LocalPrintChannel::with_writer` and read the other.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A runner that returns a canned outcome without spawning anything.
#[derive(Debug, Clone)]
pub struct FakeRunner {
    return_code: i32,
    output: Vec<String>,
    spawn_failure: Option<String>,
    requests: Arc<Mutex<Vec<JobRequest>>>,
}

impl FakeRunner {
    pub fn exiting_with(return_code: i32) -> Self {
        Self {
            return_code,
            output: Vec::new(),
            spawn_failure: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Lines the fake job "printed".
    pub fn with_output(mut self, lines: &[&str]) -> Self {
        self.output = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Fail every run with `SpawnError(reason)`.
    pub fn failing_to_spawn(reason: &str) -> Self {
        Self {
            spawn_failure: Some(reason.to_string()),
            ..Self::exiting_with(0)
        }
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<JobRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl JobRunner for FakeRunner {
    fn execute<'a>(&'a self, request: &'a JobRequest) -> RunFuture<'a> {
        self.requests.lock().unwrap().push(request.clone());

        let result = match &self.spawn_failure {
            Some(reason) => Err(JobNotifyError::SpawnError {
                command: request.command_line(),
                reason: reason.clone(),
            }),
            None => {
                let record = RecordBuilder::new(&request.command_line(), &request.work_dir)
                    .return_code(self.return_code)
                    .pid(Pid::Local(std::process::id()))
                    .build();
                Ok(JobOutcome {
                    record,
                    output_tail: self.output.clone(),
                    total_lines: self.output.len(),
                })
            }
        };
        Box::pin(async move { result })
    }
}
