// src/notify/local.rs

use std::io::{self, Write};
use std::sync::Mutex;

use crate::errors::JobNotifyError;

use super::{Channel, DeliverFuture};

const RULE: &str = "============================================================";

/// Prints the report to the local console, framed by separator lines.
///
/// Used when the user picks `local-print` and as the fallback target when
/// a remote delivery fails.
pub struct LocalPrintChannel {
    out: Mutex<Box<dyn Write + Send>>,
}

impl LocalPrintChannel {
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Print into `writer` instead of stdout.
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }

    fn print(&self, markdown: &str) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out)?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "Job report")?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "{}", markdown.trim_end())?;
        writeln!(out, "{RULE}")?;
        writeln!(out)?;
        out.flush()
    }
}

impl Channel for LocalPrintChannel {
    fn name(&self) -> &'static str {
        "local-print"
    }

    fn deliver<'a>(&'a self, markdown: &'a str) -> DeliverFuture<'a> {
        let result = self
            .print(markdown)
            .map_err(|e| JobNotifyError::DeliveryError(format!("writing to console: {e}")));
        Box::pin(async move { result })
    }
}
