// Configuration source loading.
//
// Priority order:
// 1. Environment variables (TSBENCH_* prefix)
// 2. Config file path from TSBENCH_CONFIG
// 3. Default config file (./tsbench.toml)
// 4. Built-in defaults
//
// Loaders do not validate; callers validate once after their own overrides.

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::BenchConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;
use tracing::debug;

const DEFAULT_CONFIG_FILE: &str = "./tsbench.toml";

/// Load configuration from the standard locations, falling back to defaults.
pub fn load_config() -> Result<BenchConfig> {
    let mut config = load_from_file()?.unwrap_or_default();
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    Ok(config)
}

fn load_from_file() -> Result<Option<BenchConfig>> {
    if let Ok(path) = env::var(format!("{}CONFIG", ENV_PREFIX)) {
        return read_file(Path::new(&path)).map(Some);
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        return read_file(default_path).map(Some);
    }

    Ok(None)
}

fn read_file(path: &Path) -> Result<BenchConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: BenchConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<BenchConfig> {
    let mut config = read_file(path.as_ref())?;
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OutputBackend, Wave};

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        std::fs::write(
            &path,
            r#"
            [workload]
            devices = 4
            wave = "square"

            [output]
            backend = "memory"
            "#,
        )
        .unwrap();

        let config = read_file(&path).unwrap();
        assert_eq!(config.workload.devices, 4);
        assert_eq!(config.workload.wave, Wave::Square);
        assert_eq!(config.output.backend, OutputBackend::Memory);
    }

    #[test]
    fn loading_leaves_validation_to_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        std::fs::write(&path, "[run]\nrepetitions = 0\n").unwrap();

        let mut config = load_from_file_path(&path).unwrap();
        assert!(config.validate().is_err());
        config.run.repetitions = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[workload]\ndevices = \"many\"\n").unwrap();
        let err = read_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
