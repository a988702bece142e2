// src/exec/log_sink.rs

//! Destination for the child's merged output.
//!
//! Every line is echoed to the console, kept in a bounded in-memory window
//! and, when a log target is configured, appended to the log file as it
//! arrives. The file is framed by a header written before the first line
//! and a trailer (timings, exit code, key/value dump of the record) written
//! once the record is final.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::record::{CompletionRecord, format_time};

/// Lines retained in memory for the report excerpt.
pub const MEMORY_WINDOW: usize = 10_000;

const SEPARATOR: &str = "------------------------------------------------------------";

pub struct OutputLog {
    recent: VecDeque<String>,
    window: usize,
    total_lines: usize,
    echo: bool,
    file: Option<LogFile>,
}

struct LogFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl OutputLog {
    /// An output log that only keeps lines in memory (and echoes them).
    pub fn in_memory(echo: bool) -> Self {
        Self {
            recent: VecDeque::new(),
            window: MEMORY_WINDOW,
            total_lines: 0,
            echo,
            file: None,
        }
    }

    /// Open the log file for `target` and write its header.
    ///
    /// `target` with an extension is used as the file path; otherwise it is
    /// a directory and a fresh `job_<timestamp>.log` is created in it.
    pub fn create(
        target: &Path,
        started_at: NaiveDateTime,
        command: &str,
        work_dir: &Path,
        echo: bool,
    ) -> io::Result<Self> {
        let (path, file) = open_log_file(target, started_at)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "[start] {}", format_time(&started_at))?;
        writeln!(writer, "[command] {command}")?;
        writeln!(writer, "[work_dir] {}", work_dir.display())?;
        writeln!(writer, "{SEPARATOR}")?;
        writeln!(writer)?;
        writer.flush()?;

        debug!(log_file = %path.display(), "opened job log");

        let mut log = Self::in_memory(echo);
        log.file = Some(LogFile { path, writer });
        Ok(log)
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path.as_path())
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    /// Record one line of child output (without its trailing newline).
    pub fn push_line(&mut self, line: &str) {
        if self.echo {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{line}");
            let _ = out.flush();
        }

        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(line.to_string());
        self.total_lines += 1;

        let failed = match self.file.as_mut() {
            Some(file) => writeln!(file.writer, "{line}")
                .and_then(|_| file.writer.flush())
                .err()
                .map(|e| (file.path.clone(), e)),
            None => None,
        };
        if let Some((path, err)) = failed {
            // Keep running the job; only the file copy is lost.
            warn!(log_file = %path.display(), error = %err, "log file write failed; continuing without it");
            self.file = None;
        }
    }

    /// The last `n` captured lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let skip = self.recent.len().saturating_sub(n);
        self.recent.iter().skip(skip).cloned().collect()
    }

    /// Append the trailer for `record` and close the file.
    ///
    /// Returns the log path when the file was written completely.
    pub fn finish(&mut self, record: &CompletionRecord) -> Option<PathBuf> {
        let mut file = self.file.take()?;
        match write_trailer(&mut file.writer, record) {
            Ok(()) => Some(file.path),
            Err(e) => {
                warn!(log_file = %file.path.display(), error = %e, "failed to write log trailer");
                None
            }
        }
    }
}

fn write_trailer(writer: &mut impl Write, record: &CompletionRecord) -> io::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{SEPARATOR}")?;
    writeln!(writer, "[end] {}", format_time(&record.end_time()))?;
    writeln!(writer, "[elapsed] {:.2}s", record.elapsed_seconds())?;
    writeln!(writer, "[exit_code] {}", record.return_code())?;
    writeln!(writer)?;
    writeln!(writer, "===== completion record =====")?;
    for (key, value) in record.fields() {
        writeln!(writer, "{key:<16}: {value}")?;
    }
    writeln!(writer, "=============================")?;
    writer.flush()
}

/// Resolve `target` to a concrete file and open it.
fn open_log_file(target: &Path, started_at: NaiveDateTime) -> io::Result<(PathBuf, File)> {
    if target.extension().is_some() {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(target)?;
        return Ok((target.to_path_buf(), file));
    }

    fs::create_dir_all(target)?;
    let stem = format!("job_{}", started_at.format("%Y%m%d_%H%M%S"));
    // create_new never clobbers an earlier run's log, even one that
    // started within the same second.
    let mut attempt: u32 = 0;
    loop {
        let name = if attempt == 0 {
            format!("{stem}.log")
        } else {
            format!("{stem}_{attempt}.log")
        };
        let path = target.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}
