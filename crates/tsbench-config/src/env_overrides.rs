use super::{BenchConfig, LogFormat, OutputBackend, ReportFormat, Wave};
use anyhow::{anyhow, Context, Result};
use std::str::FromStr;

pub const ENV_PREFIX: &str = "TSBENCH_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    /// Look up `key` with the TSBENCH_ prefix applied
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut BenchConfig, env: &E) -> Result<()> {
    // Workload shape
    if let Some(val) = get_env_parsed::<_, usize>(env, "DEVICES")? {
        config.workload.devices = val;
    }
    if let Some(val) = get_env_parsed::<_, usize>(env, "SENSORS")? {
        config.workload.sensors = val;
    }
    if let Some(val) = get_env_string(env, "POINTS") {
        config.workload.points = parse_list(&val)
            .with_context(|| format!("Failed to parse {}POINTS", ENV_PREFIX))?;
    }
    if let Some(val) = get_env_string(env, "DATA_TYPE") {
        config.workload.data_type = val
            .parse()
            .map_err(|e| anyhow!("Invalid {}DATA_TYPE value: {}", ENV_PREFIX, e))?;
    }
    if let Some(val) = get_env_string(env, "WAVE") {
        config.workload.wave = val
            .parse::<Wave>()
            .with_context(|| format!("Invalid {}WAVE value", ENV_PREFIX))?;
    }
    if let Some(val) = get_env_parsed::<_, f64>(env, "AMPLITUDE")? {
        config.workload.amplitude = val;
    }
    if let Some(val) = get_env_parsed::<_, u64>(env, "PERIOD")? {
        config.workload.period = val;
    }
    if let Some(val) = get_env_parsed::<_, u64>(env, "SEED")? {
        config.workload.seed = val;
    }
    if let Some(val) = get_env_parsed::<_, bool>(env, "ALIGNED")? {
        config.workload.aligned = val;
    }

    // Writer
    if let Some(val) = get_env_string(env, "ENCODING") {
        config.writer.encoding = val
            .parse()
            .map_err(|e| anyhow!("Invalid {}ENCODING value: {}", ENV_PREFIX, e))?;
    }
    if let Some(val) = get_env_string(env, "COMPRESSION") {
        config.writer.compression = val
            .parse()
            .map_err(|e| anyhow!("Invalid {}COMPRESSION value: {}", ENV_PREFIX, e))?;
    }
    if let Some(val) = get_env_parsed::<_, usize>(env, "ROW_GROUP_SIZE")? {
        config.writer.row_group_size = val;
    }

    // Output
    if let Some(val) = get_env_string(env, "OUTPUT_BACKEND") {
        config.output.backend = val
            .parse::<OutputBackend>()
            .with_context(|| format!("Invalid {}OUTPUT_BACKEND value", ENV_PREFIX))?;
    }
    if let Some(val) = get_env_string(env, "OUTPUT_PATH") {
        config.output.path = val;
    }
    if let Some(val) = get_env_parsed::<_, bool>(env, "KEEP_FILE")? {
        config.output.keep_file = val;
    }

    // Run
    if let Some(val) = get_env_parsed::<_, usize>(env, "REPETITIONS")? {
        config.run.repetitions = val;
    }
    if let Some(val) = get_env_parsed::<_, u64>(env, "MONITOR_INTERVAL_MS")? {
        config.run.monitor_interval_ms = val;
    }
    if let Some(val) = get_env_string(env, "REPORT_FORMAT") {
        config.run.report_format = val
            .parse::<ReportFormat>()
            .with_context(|| format!("Invalid {}REPORT_FORMAT value", ENV_PREFIX))?;
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.log.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.log.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key).filter(|v| !v.trim().is_empty())
}

fn get_env_parsed<E, T>(env: &E, key: &str) -> Result<Option<T>>
where
    E: EnvSource,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Parse a comma-separated list such as `1,100,1000`.
fn parse_list(value: &str) -> Result<Vec<usize>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|e| anyhow!("'{}' is not a point count: {}", s, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataType;
    use std::collections::HashMap;

    struct MapEnv(HashMap<&'static str, &'static str>);

    impl EnvSource for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    fn env(pairs: &[(&'static str, &'static str)]) -> MapEnv {
        MapEnv(pairs.iter().copied().collect())
    }

    #[test]
    fn overrides_apply() {
        let mut config = BenchConfig::default();
        apply_env_overrides(
            &mut config,
            &env(&[
                ("DEVICES", "2"),
                ("POINTS", "1, 100,1000"),
                ("DATA_TYPE", "int32"),
                ("ALIGNED", "false"),
                ("OUTPUT_BACKEND", "memory"),
                ("KEEP_FILE", "false"),
                ("REPORT_FORMAT", "json"),
                ("LOG_FORMAT", "JSON"),
            ]),
        )
        .unwrap();

        assert_eq!(config.workload.devices, 2);
        assert_eq!(config.workload.points, vec![1, 100, 1000]);
        assert_eq!(config.workload.data_type, DataType::Int32);
        assert!(!config.workload.aligned);
        assert_eq!(config.output.backend, OutputBackend::Memory);
        assert!(!config.output.keep_file);
        assert_eq!(config.run.report_format, ReportFormat::Json);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn bad_number_is_an_error() {
        let mut config = BenchConfig::default();
        let err = apply_env_overrides(&mut config, &env(&[("REPETITIONS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("TSBENCH_REPETITIONS"));
    }

    #[test]
    fn empty_values_are_ignored() {
        let mut config = BenchConfig::default();
        apply_env_overrides(&mut config, &env(&[("OUTPUT_PATH", "  ")])).unwrap();
        assert_eq!(config.output.path, "tsbench.parquet");
    }

    #[test]
    fn bad_point_list_is_an_error() {
        assert!(parse_list("10,x").is_err());
        assert_eq!(parse_list("5,").unwrap(), vec![5]);
    }
}
