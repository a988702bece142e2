// src/sampler.rs

//! Point-in-time CPU / memory / GPU sampling for one process.
//!
//! Purely informational: samples are logged, never used to decide anything.
//! CPU and memory come from `sysinfo`; GPU utilisation from `nvidia-smi`
//! when it is on `PATH`.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use sysinfo::{Pid as SysPid, System};
use tracing::debug;

use crate::errors::{JobNotifyError, Result};

const GPU_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Accumulated samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceMetrics {
    cpu_samples: Vec<f32>,
    gpu_samples: Vec<f32>,
    max_memory_mb: f64,
}

impl ResourceMetrics {
    pub fn add_cpu(&mut self, value: f32) {
        self.cpu_samples.push(value);
    }

    pub fn add_gpu(&mut self, value: f32) {
        self.gpu_samples.push(value);
    }

    pub fn update_memory(&mut self, value_mb: f64) {
        self.max_memory_mb = self.max_memory_mb.max(value_mb);
    }

    pub fn avg_cpu(&self) -> f32 {
        average(&self.cpu_samples).unwrap_or(0.0)
    }

    /// `None` when no GPU sample was ever taken.
    pub fn avg_gpu(&self) -> Option<f32> {
        average(&self.gpu_samples)
    }

    pub fn max_memory_mb(&self) -> f64 {
        self.max_memory_mb
    }

    pub fn sample_count(&self) -> usize {
        self.cpu_samples.len()
    }
}

fn average(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

/// One reading: (CPU %, memory MB, GPU %).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    pub cpu_percent: f32,
    pub memory_mb: f64,
    pub gpu_percent: Option<f32>,
}

pub struct ResourceSampler {
    pid: SysPid,
    system: System,
    metrics: ResourceMetrics,
    nvidia_smi: Option<PathBuf>,
}

impl ResourceSampler {
    /// Start sampling `pid`. Fails if no such process is visible.
    pub fn new(pid: u32) -> Result<Self> {
        let pid = SysPid::from_u32(pid);
        let mut system = System::new();
        // First refresh primes the CPU counters; usage is relative to it.
        if !system.refresh_process(pid) {
            return Err(JobNotifyError::Other(anyhow::anyhow!(
                "process does not exist: PID={pid}"
            )));
        }

        Ok(Self {
            pid,
            system,
            metrics: ResourceMetrics::default(),
            nvidia_smi: find_in_path("nvidia-smi"),
        })
    }

    pub fn metrics(&self) -> &ResourceMetrics {
        &self.metrics
    }

    pub fn into_metrics(self) -> ResourceMetrics {
        self.metrics
    }

    /// CPU usage in percent; 0 if the process is gone.
    pub fn sample_cpu(&mut self) -> f32 {
        if !self.system.refresh_process(self.pid) {
            return 0.0;
        }
        let cpu = self
            .system
            .process(self.pid)
            .map(|p| p.cpu_usage())
            .unwrap_or(0.0);
        self.metrics.add_cpu(cpu);
        cpu
    }

    /// Resident memory in MB; 0 if the process is gone.
    pub fn sample_memory(&mut self) -> f64 {
        let Some(process) = self.system.process(self.pid) else {
            return 0.0;
        };
        let mb = process.memory() as f64 / 1024.0 / 1024.0;
        self.metrics.update_memory(mb);
        mb
    }

    /// Average utilisation across all GPUs, or `None` without `nvidia-smi`
    /// or when the query fails.
    pub fn sample_gpu(&mut self) -> Option<f32> {
        let smi = self.nvidia_smi.as_ref()?;
        let output = run_with_timeout(
            Command::new(smi)
                .arg("--query-gpu=utilization.gpu")
                .arg("--format=csv,noheader,nounits"),
            GPU_QUERY_TIMEOUT,
        )?;
        let gpu = parse_gpu_utilisation(&output)?;
        self.metrics.add_gpu(gpu);
        Some(gpu)
    }

    pub fn sample_all(&mut self) -> ResourceSample {
        let cpu_percent = self.sample_cpu();
        let memory_mb = self.sample_memory();
        let gpu_percent = self.sample_gpu();
        ResourceSample {
            cpu_percent,
            memory_mb,
            gpu_percent,
        }
    }
}

/// Mean of the per-GPU percentages `nvidia-smi` prints one per line.
pub fn parse_gpu_utilisation(output: &str) -> Option<f32> {
    let values: Vec<f32> = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.parse::<f32>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    average(&values)
}

fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Option<String> {
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => break,
            Ok(Some(_)) | Err(_) => return None,
            Ok(None) if Instant::now() >= deadline => {
                debug!("nvidia-smi timed out; skipping GPU sample");
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(20)),
        }
    }
    let mut out = String::new();
    let mut stdout = child.stdout.take()?;
    std::io::Read::read_to_string(&mut stdout, &mut out).ok()?;
    Some(out)
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
