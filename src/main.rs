use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tsbench::BenchConfig;
use tsbench_config::OutputBackend;

/// Synthetic time-series write benchmark
#[derive(Parser)]
#[command(name = "tsbench")]
#[command(version)]
#[command(about = "Synthetic time-series write benchmark for columnar files", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output file (filesystem backend)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Trials per point count
    #[arg(short, long, value_name = "N")]
    repetitions: Option<usize>,

    /// Keep the output file after each trial
    #[arg(long)]
    keep_file: bool,

    /// Write to an in-memory buffer instead of a file
    #[arg(long, conflicts_with = "output")]
    memory: bool,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    // Initialize tracing before the first trial
    tsbench::init_tracing(&config);

    display_startup_info(&config);

    tsbench::run_with_config(&config)?;
    Ok(())
}

/// Layer file, environment and CLI settings, then validate once.
fn resolve_config(cli: &Cli) -> Result<BenchConfig> {
    // Step 1: Load base configuration
    let mut config = if let Some(config_path) = &cli.config {
        BenchConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        BenchConfig::load().context("Failed to load configuration")?
    };

    // Step 2: Apply CLI overrides (highest priority)
    apply_cli_overrides(&mut config, cli);

    // Step 3: Validate the merged result
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn apply_cli_overrides(config: &mut BenchConfig, cli: &Cli) {
    if cli.memory {
        config.output.backend = OutputBackend::Memory;
    }

    if let Some(output) = &cli.output {
        config.output.backend = OutputBackend::Fs;
        config.output.path = output.to_string_lossy().to_string();
    }

    if let Some(repetitions) = cli.repetitions {
        config.run.repetitions = repetitions;
    }

    if cli.keep_file {
        config.output.keep_file = true;
    }

    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
}

fn display_startup_info(config: &BenchConfig) {
    use tracing::info;

    let workload = &config.workload;
    let points = workload
        .points
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    info!("╭─────────────────────────────────────────────────");
    info!("│ tsbench v{}", env!("CARGO_PKG_VERSION"));
    info!("├─────────────────────────────────────────────────");
    info!("│ Devices: {}", workload.devices);
    info!("│ Sensors: {}", workload.sensors);
    info!("│ Points per column: {}", points);
    info!("│ Data type: {}", workload.data_type);
    info!("│ Wave: {}", workload.wave);
    info!(
        "│ Layout: {}",
        if workload.aligned {
            "aligned"
        } else {
            "non-aligned"
        }
    );
    info!(
        "│ Encoding: {} ({})",
        config.writer.encoding, config.writer.compression
    );
    info!("│ Output backend: {}", config.output.backend);
    if config.output.backend == OutputBackend::Fs {
        info!("│   - Path: {}", config.output.path);
        info!("│   - Keep file: {}", config.output.keep_file);
    }
    info!("│ Repetitions: {}", config.run.repetitions);
    info!("│ Log level: {}", config.log.level);
    info!("╰─────────────────────────────────────────────────");
}
