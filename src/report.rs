//! Benchmark report rendering.

use crate::driver::TrialMetrics;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use tsbench_config::{BenchConfig, OutputBackend, Wave};
use tsbench_writer::{Compression, DataType, Encoding};

const MIB: f64 = 1024.0 * 1024.0;

fn to_mib(bytes: u64) -> f64 {
    bytes as f64 / MIB
}

/// Configuration a series was run with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSummary {
    pub file_name: String,
    pub data_type: DataType,
    pub encoding: Encoding,
    pub compression: Compression,
    pub devices: usize,
    pub sensors: usize,
    pub points_per_column: usize,
    pub wave: Wave,
    pub aligned: bool,
}

impl ConfigSummary {
    pub fn new(config: &BenchConfig, points_per_column: usize) -> Self {
        let file_name = match config.output.backend {
            OutputBackend::Fs => config.output.path.clone(),
            OutputBackend::Memory => "<memory>".to_string(),
        };
        Self {
            file_name,
            data_type: config.workload.data_type,
            encoding: config.writer.encoding,
            compression: config.writer.compression,
            devices: config.workload.devices,
            sensors: config.workload.sensors,
            points_per_column,
            wave: config.workload.wave,
            aligned: config.workload.aligned,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialSummary {
    pub repetition: usize,
    pub records: u64,
    pub total_points: u64,
    pub elapsed_secs: f64,
    pub throughput: f64,
    pub max_memory_mib: f64,
    pub file_size_mib: f64,
}

impl TrialSummary {
    pub fn new(repetition: usize, metrics: &TrialMetrics) -> Self {
        Self {
            repetition,
            records: metrics.records,
            total_points: metrics.total_points,
            elapsed_secs: metrics.elapsed.as_secs_f64(),
            throughput: metrics.throughput(),
            max_memory_mib: to_mib(metrics.peak_memory_bytes),
            file_size_mib: to_mib(metrics.output_bytes),
        }
    }
}

/// All repetitions for one point count, with their averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesReport {
    pub config: ConfigSummary,
    pub trials: Vec<TrialSummary>,
    pub avg_throughput: f64,
    pub avg_max_memory_mib: f64,
    pub avg_file_size_mib: f64,
}

impl SeriesReport {
    /// Average every metric over `trials`. Averages are sums divided by the
    /// trial count, so the throughput average is the mean of per-trial rates.
    pub fn from_trials(config: ConfigSummary, trials: Vec<TrialSummary>) -> Self {
        let count = trials.len().max(1) as f64;
        let (throughput, memory, size) = trials.iter().fold((0.0, 0.0, 0.0), |acc, t| {
            (
                acc.0 + t.throughput,
                acc.1 + t.max_memory_mib,
                acc.2 + t.file_size_mib,
            )
        });
        Self {
            config,
            trials,
            avg_throughput: throughput / count,
            avg_max_memory_mib: memory / count,
            avg_file_size_mib: size / count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchReport {
    pub version: &'static str,
    pub series: Vec<SeriesReport>,
}

impl BenchReport {
    pub fn new(series: Vec<SeriesReport>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            series,
        }
    }
}

pub fn write_trial_line<W: Write>(out: &mut W, trial: &TrialSummary) -> Result<()> {
    writeln!(
        out,
        "Generation completed. avg speed: {:.6}pt/s, max memory usage: {:.6}MB, file size: {:.6}MB",
        trial.throughput, trial.max_memory_mib, trial.file_size_mib
    )
    .context("Failed to write report")
}

pub fn write_series_summary<W: Write>(out: &mut W, series: &SeriesReport) -> Result<()> {
    let c = &series.config;
    writeln!(
        out,
        "FileName: {}; DataType: {}; Encoding: {}; DeviceNum: {}; SensorNum: {}; PtPerCol: {}; Wave: {}; Aligned: {}",
        c.file_name, c.data_type, c.encoding, c.devices, c.sensors, c.points_per_column, c.wave, c.aligned
    )
    .context("Failed to write report")?;
    writeln!(
        out,
        "Total Avg speed: {:.6}pt/s; Total max memory usage: {:.6}MB; File size: {:.6}MB",
        series.avg_throughput, series.avg_max_memory_mib, series.avg_file_size_mib
    )
    .context("Failed to write report")
}

pub fn write_json<W: Write>(out: &mut W, report: &BenchReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report).context("Failed to serialize report")?;
    writeln!(out).context("Failed to write report")
}
