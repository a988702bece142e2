// src/exec/command.rs

//! Turning a configured command into an argv.
//!
//! Commands are never handed to a shell: the line is split on whitespace
//! and the first token is executed directly.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Matches `python`, `python3`, `python3.11`, and so on.
static PYTHON_INTERPRETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^python(\d+(\.\d+)*)?$").expect("interpreter pattern is valid")
});

/// Split a command line into argv tokens.
pub fn split_command_line(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Whether `program` (possibly a path) names a Python interpreter.
pub fn is_python_interpreter(program: &str) -> bool {
    let name = Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program);
    PYTHON_INTERPRETER.is_match(name)
}

/// Insert `-u` after a Python interpreter so the child does not batch its
/// own stdout when it sees a pipe instead of a terminal.
///
/// Other programs are returned unchanged.
pub fn normalize_argv(tokens: &[String]) -> Vec<String> {
    let mut argv = tokens.to_vec();
    let Some(program) = argv.first() else {
        return argv;
    };

    if is_python_interpreter(program) && !argv.iter().skip(1).any(|t| t == "-u") {
        argv.insert(1, "-u".to_string());
    }
    argv
}
