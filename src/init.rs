// Logging/tracing setup
//
// Logs go to stderr; stdout carries only the report.

use tsbench_config::{BenchConfig, LogFormat};

/// Initialize tracing from BenchConfig
pub fn init_tracing(config: &BenchConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // RUST_LOG wins over the configured level when set
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match config.log.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_writer(std::io::stderr)),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_writer(std::io::stderr)),
        ),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_ignored() {
        let mut config = BenchConfig::default();
        init_tracing(&config);
        config.log.format = LogFormat::Json;
        config.log.level = "not a level[".to_string();
        init_tracing(&config);
        tracing::info!("still logging");
    }
}
