// src/report.rs

//! ReportFormatter: completion record → human-readable text.
//!
//! Pure functions, no I/O.

use crate::record::CompletionRecord;

/// Plain-text report, one `key: value` per line.
pub fn plain(record: &CompletionRecord) -> String {
    let mut out = format!("[{}]\n\n", headline(record));
    for (key, value) in record.fields() {
        out.push_str(&format!("{key}: {value}\n"));
    }
    out
}

/// Markdown report suitable for push services that render Markdown.
pub fn markdown(record: &CompletionRecord) -> String {
    let mut out = format!("## {}\n\n", headline(record));
    for (key, value) in record.fields() {
        match key {
            "command" | "work_dir" | "log_file" if value != "-" => {
                out.push_str(&format!("- {key}: `{value}`\n"));
            }
            _ => out.push_str(&format!("- {key}: {value}\n")),
        }
    }
    out
}

/// Markdown report with the last log lines appended as a fenced block.
/// An empty `lines` slice leaves the report unchanged.
pub fn markdown_with_tail(record: &CompletionRecord, lines: &[String]) -> String {
    let mut out = markdown(record);
    if lines.is_empty() {
        return out;
    }

    // Longer fence than any backtick run in the log, so it cannot close early.
    let longest = lines
        .iter()
        .map(|l| longest_backtick_run(l))
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);

    out.push_str(&format!("\n### Log tail (last {} lines)\n\n", lines.len()));
    out.push_str(&fence);
    out.push('\n');
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&fence);
    out.push('\n');
    out
}

fn headline(record: &CompletionRecord) -> &'static str {
    if record.succeeded() {
        "Job finished"
    } else {
        "Job failed"
    }
}

fn longest_backtick_run(line: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in line.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}
