#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use jobnotify::exec::JobRequest;
use jobnotify::notify::LocalPrintChannel;
use jobnotify_test_utils::SharedBuffer;

/// A request running `script` through `sh -c`, without echo.
pub fn sh_request(script: &str, work_dir: &Path) -> JobRequest {
    let mut request = JobRequest::new("sh", work_dir).quiet();
    request.command = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
    request
}

/// Write `contents` to `<dir>/<name>` and return the path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// A local-print channel whose output can be inspected.
pub fn captured_local_print() -> (LocalPrintChannel, SharedBuffer) {
    let buffer = SharedBuffer::new();
    (LocalPrintChannel::with_writer(buffer.clone()), buffer)
}

/// Files directly inside `dir`, sorted by name.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
