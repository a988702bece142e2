// tests/sampler.rs

use jobnotify::sampler::{ResourceMetrics, ResourceSampler, parse_gpu_utilisation};

#[test]
fn gpu_output_is_averaged_across_devices() {
    assert_eq!(parse_gpu_utilisation("35\n45\n"), Some(40.0));
    assert_eq!(parse_gpu_utilisation(" 100 \n"), Some(100.0));
}

#[test]
fn unusable_gpu_output_is_none() {
    assert_eq!(parse_gpu_utilisation(""), None);
    assert_eq!(parse_gpu_utilisation("[N/A]\n"), None);
    assert_eq!(parse_gpu_utilisation("12\nNo devices were found\n"), None);
}

#[test]
fn metrics_accumulate() {
    let mut metrics = ResourceMetrics::default();
    assert_eq!(metrics.avg_cpu(), 0.0);
    assert_eq!(metrics.avg_gpu(), None);

    metrics.add_cpu(10.0);
    metrics.add_cpu(30.0);
    metrics.add_gpu(50.0);
    metrics.update_memory(512.0);
    metrics.update_memory(256.0);

    assert_eq!(metrics.sample_count(), 2);
    assert_eq!(metrics.avg_cpu(), 20.0);
    assert_eq!(metrics.avg_gpu(), Some(50.0));
    assert_eq!(metrics.max_memory_mb(), 512.0);
}

#[test]
fn sampler_observes_this_process() {
    let mut sampler = ResourceSampler::new(std::process::id()).unwrap();
    let sample = sampler.sample_all();

    assert!(sample.cpu_percent >= 0.0);
    assert!(sample.memory_mb > 0.0);
    assert_eq!(sampler.metrics().sample_count(), 1);
}

#[test]
fn sampler_rejects_missing_process() {
    // Above the default Linux pid_max, so never a live pid.
    assert!(ResourceSampler::new(4_000_000_000).is_err());
}
