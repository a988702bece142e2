// src/monitor/tail.rs

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

use crate::fs::FileSystem;

/// Last `n` lines of the file at `path`, oldest first.
///
/// Streams the file through a bounded window, so a multi-gigabyte training
/// log costs `n` lines of memory. Invalid UTF-8 is replaced, not rejected.
pub fn read_tail(fs: &dyn FileSystem, path: &Path, n: usize) -> Result<Vec<String>> {
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut reader = BufReader::new(fs.open_read(path)?);
    let mut window: VecDeque<String> = VecDeque::with_capacity(n);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("reading log file {:?}", path))?;
        if read == 0 {
            break;
        }
        if window.len() == n {
            window.pop_front();
        }
        let line = String::from_utf8_lossy(&buf);
        window.push_back(line.trim_end_matches(['\n', '\r']).to_string());
    }

    Ok(window.into())
}
