// tsbench-config - Benchmark configuration
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from TSBENCH_CONFIG env var
// 3. Default config file location (./tsbench.toml)
// 4. Built-in defaults (lowest priority)
//
// The resulting BenchConfig is validated once and never mutated afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};
pub use tsbench_writer::{Compression, DataType, Encoding};

/// Complete benchmark configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub workload: WorkloadConfig,

    #[serde(default)]
    pub writer: WriterConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Shape of the synthetic dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub devices: usize,
    pub sensors: usize,
    /// Points per column; one repetition set runs for each entry
    pub points: Vec<usize>,
    pub data_type: DataType,
    pub wave: Wave,
    pub amplitude: f64,
    /// Samples per cycle for periodic waves
    pub period: u64,
    /// Increment for linear waves, maximum move for random walks
    pub step: f64,
    pub seed: u64,
    pub aligned: bool,
    pub device_prefix: String,
    pub sensor_prefix: String,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            devices: 500,
            sensors: 10,
            points: vec![10_000],
            data_type: DataType::Float,
            wave: Wave::Sine,
            amplitude: 100.0,
            period: 1_000,
            step: 1.0,
            seed: 42,
            aligned: true,
            device_prefix: "device_".to_string(),
            sensor_prefix: "sensor_".to_string(),
        }
    }
}

impl WorkloadConfig {
    pub fn device_name(&self, index: usize) -> String {
        format!("{}{}", self.device_prefix, index)
    }

    pub fn sensor_name(&self, index: usize) -> String {
        format!("{}{}", self.sensor_prefix, index)
    }
}

/// Waveform followed by the data generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wave {
    Constant,
    Linear,
    Sine,
    Square,
    RandomWalk,
    Random,
}

impl std::fmt::Display for Wave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Wave::Constant => write!(f, "constant"),
            Wave::Linear => write!(f, "linear"),
            Wave::Sine => write!(f, "sine"),
            Wave::Square => write!(f, "square"),
            Wave::RandomWalk => write!(f, "random_walk"),
            Wave::Random => write!(f, "random"),
        }
    }
}

impl std::str::FromStr for Wave {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "constant" | "const" => Ok(Wave::Constant),
            "linear" => Ok(Wave::Linear),
            "sine" | "sin" => Ok(Wave::Sine),
            "square" => Ok(Wave::Square),
            "random_walk" | "randomwalk" | "walk" => Ok(Wave::RandomWalk),
            "random" | "uniform" => Ok(Wave::Random),
            _ => anyhow::bail!(
                "Unsupported wave: {}. Supported: constant, linear, sine, square, random_walk, random",
                s
            ),
        }
    }
}

/// Column layout handed to the writer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    pub encoding: Encoding,
    pub compression: Compression,
    pub row_group_size: usize,
    pub batch_rows: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Rle,
            compression: Compression::Snappy,
            row_group_size: 32 * 1024,
            batch_rows: 8 * 1024,
        }
    }
}

/// Where trial output lands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub backend: OutputBackend,
    pub path: String,
    /// Keep the file after each trial instead of deleting it
    pub keep_file: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backend: OutputBackend::Fs,
            path: "tsbench.parquet".to_string(),
            keep_file: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputBackend {
    Fs,
    Memory,
}

impl std::fmt::Display for OutputBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputBackend::Fs => write!(f, "fs"),
            OutputBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for OutputBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fs" | "filesystem" | "file" => Ok(OutputBackend::Fs),
            "memory" | "mem" => Ok(OutputBackend::Memory),
            _ => anyhow::bail!("Unsupported output backend: {}. Supported: fs, memory", s),
        }
    }
}

/// Repetition and measurement settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub repetitions: usize,
    pub monitor_interval_ms: u64,
    pub report_format: ReportFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            repetitions: 1,
            monitor_interval_ms: 100,
            report_format: ReportFormat::Text,
        }
    }
}

impl RunConfig {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => anyhow::bail!("Unsupported report format: {}. Supported: text, json", s),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl BenchConfig {
    /// Load configuration from all sources with priority. The result is not
    /// validated; call [`BenchConfig::validate`] after any further overrides.
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from a specific file path (for CLI usage).
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Parse TOML content on top of the built-in defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse benchmark config")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}
