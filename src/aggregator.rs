//! Repetition and point-count sweep over single trials.

use crate::driver::{run_trial, TrialMetrics};
use crate::report::{self, BenchReport, ConfigSummary, SeriesReport, TrialSummary};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};
use tsbench_config::{BenchConfig, OutputBackend, ReportFormat};

/// Runs every configured trial strictly one after another and writes the
/// report to `out`.
pub struct Aggregator<'a, W: Write> {
    config: &'a BenchConfig,
    out: W,
}

impl<'a, W: Write> Aggregator<'a, W> {
    pub fn new(config: &'a BenchConfig, out: W) -> Self {
        Self { config, out }
    }

    /// Run the full sweep against the configured backend.
    pub fn run(&mut self) -> Result<BenchReport> {
        self.run_with(run_trial)
    }

    /// Run the full sweep with a caller-supplied trial runner.
    pub fn run_with<F>(&mut self, mut trial: F) -> Result<BenchReport>
    where
        F: FnMut(&BenchConfig, usize) -> Result<TrialMetrics>,
    {
        let config = self.config;
        let mut series = Vec::with_capacity(config.workload.points.len());
        for &points in &config.workload.points {
            series.push(self.run_series_with(points, &mut trial)?);
        }
        let report = BenchReport::new(series);
        if config.run.report_format == ReportFormat::Json {
            report::write_json(&mut self.out, &report)?;
        }
        self.out.flush().context("Failed to flush report")?;
        Ok(report)
    }

    /// Run `run.repetitions` trials of `points` points per column.
    pub fn run_series_with<F>(&mut self, points: usize, trial: &mut F) -> Result<SeriesReport>
    where
        F: FnMut(&BenchConfig, usize) -> Result<TrialMetrics>,
    {
        let repetitions = self.config.run.repetitions;
        let text = self.config.run.report_format == ReportFormat::Text;
        let mut trials = Vec::with_capacity(repetitions);

        for repetition in 0..repetitions {
            info!(points, repetition = repetition + 1, repetitions, "starting trial");
            let metrics = trial(self.config, points)
                .with_context(|| format!("Trial {} of {} failed", repetition + 1, repetitions))?;
            self.discard_output()?;

            let summary = TrialSummary::new(repetition, &metrics);
            if text {
                report::write_trial_line(&mut self.out, &summary)?;
            }
            trials.push(summary);
        }

        let series = SeriesReport::from_trials(ConfigSummary::new(self.config, points), trials);
        if text {
            report::write_series_summary(&mut self.out, &series)?;
        }
        Ok(series)
    }

    fn discard_output(&self) -> Result<()> {
        if self.config.output.backend != OutputBackend::Fs || self.config.output.keep_file {
            return Ok(());
        }
        let path = Path::new(&self.config.output.path);
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed output file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove output file: {}", path.display())),
        }
    }
}
