// tsbench - synthetic time-series write benchmark
//
// A trial generates a deterministic workload of devices x sensors x points,
// pushes it through a columnar writer, and measures throughput, peak
// resident memory and output size. The aggregator repeats trials and sweeps
// point counts, then reports per-trial and averaged figures.
//
// Pipeline:
// - generator: one sample per tick, shared by every device and sensor
// - driver: Idle -> Initializing -> Writing -> Finalized against a TsWriter
// - monitor: background RSS sampler joined before its peak is read
// - aggregator/report: repetitions, averages, text or JSON output

pub mod aggregator;
pub mod driver;
pub mod generator;
mod init;
pub mod monitor;
pub mod report;

pub use aggregator::Aggregator;
pub use driver::{run_trial, run_trial_with, Driver, DriverState, TrialMetrics};
pub use generator::DataGenerator;
pub use init::init_tracing;
pub use monitor::{MemoryMonitor, MemoryProbe, MemoryStats, ProcessMemoryProbe};
pub use report::{BenchReport, ConfigSummary, SeriesReport, TrialSummary};

pub use tsbench_config::BenchConfig;

use anyhow::Result;

/// Run every configured trial and write the report to stdout.
pub fn run_with_config(config: &BenchConfig) -> Result<BenchReport> {
    let stdout = std::io::stdout();
    let mut aggregator = Aggregator::new(config, stdout.lock());
    aggregator.run()
}
