// tests/signal.rs

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use jobnotify::errors::JobNotifyError;
use jobnotify::exec::{CommandRunner, JobRequest};
use jobnotify::fs::mock::MockFileSystem;
use jobnotify::fs::{FileSystem, RealFileSystem};
use jobnotify::signal::{
    DEFAULT_MARKER_NAME, MarkerFile, MarkerProbe, marker_path, probe_marker, remove_marker,
    run_and_signal, write_marker,
};
use jobnotify_test_utils::{FakeRunner, RecordBuilder, init_tracing, marker_json, with_timeout};
use tempfile::tempdir;

use common::list_dir;

fn work_dir() -> &'static Path {
    Path::new("/jobs/exp1")
}

#[test]
fn published_marker_is_complete_and_leaves_no_temp_files() {
    let dir = tempdir().unwrap();
    let record = RecordBuilder::new("echo 训练 ✓", dir.path()).build();

    let path = write_marker(&RealFileSystem, dir.path(), DEFAULT_MARKER_NAME, &record).unwrap();

    assert_eq!(path, dir.path().join(DEFAULT_MARKER_NAME));
    assert_eq!(list_dir(dir.path()), vec![DEFAULT_MARKER_NAME.to_string()]);

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("echo 训练 ✓"), "non-ASCII must be written as-is");
    assert!(raw.contains("\n  \"status\": \"completed\""), "marker is pretty-printed");

    match probe_marker(&RealFileSystem, &path) {
        MarkerProbe::Ready(found) => assert_eq!(found, record.observed_remotely()),
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[test]
fn publishing_replaces_an_older_marker() {
    let dir = tempdir().unwrap();
    let first = RecordBuilder::new("first", dir.path()).build();
    let second = RecordBuilder::new("second", dir.path()).return_code(4).build();

    write_marker(&RealFileSystem, dir.path(), "m.json", &first).unwrap();
    let path = write_marker(&RealFileSystem, dir.path(), "m.json", &second).unwrap();

    let marker: MarkerFile = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(marker.command, "second");
    assert_eq!(marker.return_code, 4);
    assert_eq!(list_dir(dir.path()).len(), 1);
}

/// Rewrite a large marker from one thread while this thread probes it.
///
/// Returns `(writes, unreadable probes)`. With in-place writes the probing
/// stops at the first unreadable observation.
fn probe_while_rewriting(atomic: bool, budget: Duration) -> (u32, u32) {
    let dir = tempdir().unwrap();
    let work = dir.path().to_path_buf();
    let big_command = format!("python train.py {}", "x".repeat(256 * 1024));
    let record = RecordBuilder::new(big_command.as_str(), &work).build();
    let body = marker_json(&record);
    let path = write_marker(&RealFileSystem, &work, DEFAULT_MARKER_NAME, &record).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let stop = Arc::clone(&stop);
        let path = path.clone();
        thread::spawn(move || {
            let mut writes = 0u32;
            while !stop.load(Ordering::Relaxed) {
                if atomic {
                    write_marker(&RealFileSystem, &work, DEFAULT_MARKER_NAME, &record).unwrap();
                } else {
                    RealFileSystem.write(&path, body.as_bytes()).unwrap();
                }
                writes += 1;
            }
            writes
        })
    };

    let deadline = Instant::now() + budget;
    let mut unreadable = 0u32;
    while Instant::now() < deadline {
        match probe_marker(&RealFileSystem, &path) {
            MarkerProbe::Ready(_) => {}
            MarkerProbe::Incomplete(_) => {
                unreadable += 1;
                if !atomic {
                    break;
                }
            }
            MarkerProbe::Absent => panic!("marker vanished while being rewritten"),
        }
    }

    stop.store(true, Ordering::Relaxed);
    let writes = writer.join().unwrap();
    drop(dir);
    (writes, unreadable)
}

#[test]
fn concurrent_reader_never_sees_a_half_published_marker() {
    let (writes, unreadable) = probe_while_rewriting(true, Duration::from_secs(1));
    assert!(writes > 1, "writer must overlap the reader");
    assert_eq!(unreadable, 0);
}

#[test]
fn in_place_rewrites_are_observable_half_written() {
    let (writes, unreadable) = probe_while_rewriting(false, Duration::from_secs(5));
    assert!(writes > 0);
    assert!(unreadable > 0, "in-place writes should expose a truncated marker");
}

#[test]
fn probe_reports_absent_when_nothing_is_there() {
    let fs = MockFileSystem::new();
    let path = marker_path(work_dir(), DEFAULT_MARKER_NAME);
    assert!(matches!(probe_marker(&fs, &path), MarkerProbe::Absent));
}

#[test]
fn partial_write_is_incomplete_not_an_error() {
    let fs = MockFileSystem::new();
    let path = marker_path(work_dir(), DEFAULT_MARKER_NAME);
    let full = marker_json(&RecordBuilder::new("echo hi", work_dir()).build());
    fs.add_file(&path, &full.as_bytes()[..full.len() / 2]);

    match probe_marker(&fs, &path) {
        MarkerProbe::Incomplete(JobNotifyError::MarkerParseError { path: p, .. }) => {
            assert_eq!(p, path)
        }
        other => panic!("expected Incomplete, got {other:?}"),
    }
}

#[test]
fn unfinished_status_is_incomplete() {
    let fs = MockFileSystem::new();
    let path = marker_path(work_dir(), DEFAULT_MARKER_NAME);
    let record = RecordBuilder::new("echo hi", work_dir()).build();
    let mut marker = MarkerFile::from(&record);
    marker.status = "running".to_string();
    fs.add_file(&path, serde_json::to_vec(&marker).unwrap());

    assert!(matches!(probe_marker(&fs, &path), MarkerProbe::Incomplete(_)));
}

#[test]
fn directory_named_like_the_marker_is_absent() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join(DEFAULT_MARKER_NAME)).unwrap();
    let path = marker_path(dir.path(), DEFAULT_MARKER_NAME);
    assert!(matches!(probe_marker(&RealFileSystem, &path), MarkerProbe::Absent));
}

#[test]
fn remove_failure_is_reported_not_raised() {
    init_tracing();
    let fs = MockFileSystem::new();
    let path = marker_path(work_dir(), DEFAULT_MARKER_NAME);
    fs.add_file(&path, "{}");
    fs.make_undeletable(&path);

    assert!(!remove_marker(&fs, &path));
    assert!(fs.exists(&path));

    let gone = marker_path(work_dir(), "other.json");
    assert!(!remove_marker(&fs, &gone));
}

#[tokio::test]
async fn wrapper_publishes_once_after_the_job() {
    init_tracing();
    let fs = MockFileSystem::new();
    let runner = FakeRunner::exiting_with(3);
    let request = JobRequest::new("python train.py", work_dir());

    let run = run_and_signal(&runner, &fs, &request, DEFAULT_MARKER_NAME)
        .await
        .unwrap();

    let expected = marker_path(work_dir(), DEFAULT_MARKER_NAME);
    assert_eq!(run.marker.as_deref(), Some(expected.as_path()));
    assert_eq!(run.outcome.record.return_code(), 3);
    assert_eq!(fs.publish_count(), 1);
    assert_eq!(runner.requests().len(), 1);

    match probe_marker(&fs, &expected) {
        MarkerProbe::Ready(record) => {
            assert_eq!(record.return_code(), 3);
            assert_eq!(record.command(), "python train.py");
        }
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[tokio::test]
async fn wrapper_replaces_a_stale_marker() {
    init_tracing();
    let fs = MockFileSystem::new();
    let path = marker_path(work_dir(), DEFAULT_MARKER_NAME);
    fs.add_file(&path, marker_json(&RecordBuilder::new("old job", work_dir()).build()));

    let request = JobRequest::new("new job", work_dir());
    run_and_signal(&FakeRunner::exiting_with(0), &fs, &request, DEFAULT_MARKER_NAME)
        .await
        .unwrap();

    match probe_marker(&fs, &path) {
        MarkerProbe::Ready(record) => assert_eq!(record.command(), "new job"),
        other => panic!("expected Ready, got {other:?}"),
    }
    assert_eq!(fs.removal_count(), 0);
}

#[tokio::test]
async fn spawn_failure_publishes_nothing() {
    init_tracing();
    let fs = MockFileSystem::new();
    let request = JobRequest::new("nope", work_dir());

    let result = run_and_signal(
        &FakeRunner::failing_to_spawn("not found"),
        &fs,
        &request,
        DEFAULT_MARKER_NAME,
    )
    .await;

    assert!(matches!(result, Err(JobNotifyError::SpawnError { .. })));
    assert_eq!(fs.publish_count(), 0);
    assert_eq!(fs.file_count(), 0);
}

#[tokio::test]
async fn real_job_leaves_marker_in_work_dir() {
    init_tracing();
    let dir = tempdir().unwrap();
    let request = JobRequest::new("echo hi", dir.path()).quiet();

    let run = with_timeout(run_and_signal(
        &CommandRunner::new(),
        &RealFileSystem,
        &request,
        DEFAULT_MARKER_NAME,
    ))
    .await
    .unwrap();

    let path = dir.path().join(DEFAULT_MARKER_NAME);
    assert_eq!(run.marker, Some(path.clone()));
    match probe_marker(&RealFileSystem, &path) {
        MarkerProbe::Ready(record) => {
            assert_eq!(record.return_code(), 0);
            assert_eq!(record.command(), "echo hi");
        }
        other => panic!("expected Ready, got {other:?}"),
    }
}
