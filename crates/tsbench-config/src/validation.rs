// Configuration validation
//
// Rejects values that would make a trial meaningless and warns about
// workloads large enough to exhaust memory or disk.

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

const LARGE_WORKLOAD_POINTS: u128 = 1_000_000_000;

pub fn validate_config(config: &BenchConfig) -> Result<()> {
    validate_workload_config(&config.workload)?;
    validate_writer_config(&config.writer)?;
    validate_output_config(&config.output)?;
    validate_run_config(&config.run)?;
    Ok(())
}

fn validate_workload_config(config: &WorkloadConfig) -> Result<()> {
    if config.devices == 0 {
        bail!("workload.devices must be greater than 0");
    }

    if config.sensors == 0 {
        bail!("workload.sensors must be greater than 0");
    }

    if config.points.is_empty() {
        bail!("workload.points must list at least one point count");
    }

    if config.points.contains(&0) {
        bail!("workload.points entries must be greater than 0");
    }

    if matches!(config.wave, Wave::Sine | Wave::Square) && config.period == 0 {
        bail!("workload.period must be greater than 0 for {} waves", config.wave);
    }

    // Random waves span [-x, x]; the width must stay finite too.
    for (name, value) in [("amplitude", config.amplitude), ("step", config.step)] {
        if !(2.0 * value).is_finite() {
            bail!("workload.{} must be finite and at most half of f64::MAX", name);
        }
    }

    if config.device_prefix.is_empty() || config.sensor_prefix.is_empty() {
        bail!("workload.device_prefix and workload.sensor_prefix must not be empty");
    }

    for &points in &config.points {
        let total = config.devices as u128 * config.sensors as u128 * points as u128;
        if total > LARGE_WORKLOAD_POINTS {
            warn!(
                devices = config.devices,
                sensors = config.sensors,
                points,
                "workload writes more than a billion points per trial"
            );
        }
    }

    Ok(())
}

fn validate_writer_config(config: &WriterConfig) -> Result<()> {
    if config.row_group_size == 0 {
        bail!("writer.row_group_size must be greater than 0");
    }

    if config.batch_rows == 0 {
        bail!("writer.batch_rows must be greater than 0");
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<()> {
    if config.backend == OutputBackend::Fs && config.path.trim().is_empty() {
        bail!("output.path must not be empty for the fs backend");
    }

    Ok(())
}

fn validate_run_config(config: &RunConfig) -> Result<()> {
    if config.repetitions == 0 {
        bail!("run.repetitions must be greater than 0");
    }

    if config.monitor_interval_ms == 0 {
        bail!("run.monitor_interval_ms must be greater than 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_counts() {
        let mut config = BenchConfig::default();
        config.workload.devices = 0;
        assert!(validate_config(&config).is_err());

        let mut config = BenchConfig::default();
        config.workload.points = vec![10, 0];
        assert!(validate_config(&config).is_err());

        let mut config = BenchConfig::default();
        config.run.repetitions = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn period_required_for_periodic_waves() {
        let mut config = BenchConfig::default();
        config.workload.wave = Wave::Square;
        config.workload.period = 0;
        assert!(validate_config(&config).is_err());

        config.workload.wave = Wave::Linear;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_amplitude_and_step_without_finite_range() {
        let mut config = BenchConfig::default();
        config.workload.wave = Wave::Random;
        config.workload.amplitude = 1e308;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("workload.amplitude"));

        let mut config = BenchConfig::default();
        config.workload.wave = Wave::RandomWalk;
        config.workload.step = f64::NAN;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("workload.step"));

        config.workload.step = 1e300;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn memory_backend_ignores_path() {
        let mut config = BenchConfig::default();
        config.output.path = String::new();
        assert!(validate_config(&config).is_err());

        config.output.backend = OutputBackend::Memory;
        assert!(validate_config(&config).is_ok());
    }
}
