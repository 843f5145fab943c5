//! One benchmark trial: generate, write, close, measure.
//!
//! The driver walks `Idle -> Initializing -> Writing -> Finalized`. Every
//! tick draws a single sample from the generator and reuses it for every
//! device and sensor of that tick. Records go to the writer as soon as they
//! are built; batching is the writer's business.

use crate::generator::DataGenerator;
use crate::monitor::{MemoryMonitor, MemoryProbe, ProcessMemoryProbe};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tsbench_config::{BenchConfig, OutputBackend, WorkloadConfig};
use tsbench_writer::{
    open_writer, Destination, FieldDescriptor, TsRecord, TsWriter, WriteSummary, WriterSettings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Initializing,
    Writing,
    Finalized,
}

/// Measurements from a single trial
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialMetrics {
    pub points_per_column: usize,
    /// `devices * sensors * points_per_column`
    pub total_points: u64,
    pub records: u64,
    pub elapsed: Duration,
    pub peak_memory_bytes: u64,
    pub output_bytes: u64,
}

impl TrialMetrics {
    /// Points per second over the whole trial.
    pub fn throughput(&self) -> f64 {
        self.total_points as f64 / self.elapsed.as_secs_f64().max(1e-9)
    }
}

/// `devices * sensors * points`, widened before multiplying.
pub fn total_points(workload: &WorkloadConfig, points: usize) -> u64 {
    (workload.devices as u64)
        .saturating_mul(workload.sensors as u64)
        .saturating_mul(points as u64)
}

/// Where the configured backend writes.
pub fn destination(config: &BenchConfig) -> Destination {
    match config.output.backend {
        OutputBackend::Fs => Destination::File {
            path: PathBuf::from(&config.output.path),
            overwrite: true,
        },
        OutputBackend::Memory => Destination::Memory,
    }
}

/// Writer engine settings derived from the configuration.
pub fn writer_settings(config: &BenchConfig) -> WriterSettings {
    WriterSettings {
        compression: config.writer.compression,
        row_group_size: config.writer.row_group_size,
        batch_rows: config.writer.batch_rows,
        metadata: vec![
            (
                "tsbench.devices".to_string(),
                config.workload.devices.to_string(),
            ),
            (
                "tsbench.sensors".to_string(),
                config.workload.sensors.to_string(),
            ),
            ("tsbench.wave".to_string(), config.workload.wave.to_string()),
        ],
    }
}

pub struct Driver<'a> {
    config: &'a BenchConfig,
    points: usize,
    state: DriverState,
    devices: Vec<Arc<str>>,
    sensors: Vec<Arc<str>>,
    records: u64,
}

impl<'a> Driver<'a> {
    pub fn new(config: &'a BenchConfig, points: usize) -> Self {
        let workload = &config.workload;
        Self {
            config,
            points,
            state: DriverState::Idle,
            devices: (0..workload.devices)
                .map(|i| Arc::from(workload.device_name(i)))
                .collect(),
            sensors: (0..workload.sensors)
                .map(|i| Arc::from(workload.sensor_name(i)))
                .collect(),
            records: 0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    fn transition(&mut self, from: DriverState, to: DriverState) -> Result<()> {
        if self.state != from {
            bail!(
                "driver cannot move to {:?} from {:?} (expected {:?})",
                to,
                self.state,
                from
            );
        }
        debug!(from = ?from, to = ?to, "driver state");
        self.state = to;
        Ok(())
    }

    /// Register one descriptor per sensor, all sharing type and encoding.
    pub fn initialize(&mut self, writer: &mut dyn TsWriter) -> Result<()> {
        self.transition(DriverState::Idle, DriverState::Initializing)?;
        let workload = &self.config.workload;
        for sensor in &self.sensors {
            writer
                .register_field(FieldDescriptor::new(
                    sensor.as_ref(),
                    workload.data_type,
                    self.config.writer.encoding,
                ))
                .with_context(|| format!("Failed to register field {}", sensor))?;
        }
        Ok(())
    }

    /// Generate and submit every record. Returns the number submitted.
    pub fn write(&mut self, writer: &mut dyn TsWriter) -> Result<u64> {
        self.transition(DriverState::Initializing, DriverState::Writing)?;
        let mut generator = DataGenerator::new(&self.config.workload);
        let checkpoint = (self.points / 10).max(1);

        for tick in 0..self.points {
            let value = generator.next_value();
            if self.config.workload.aligned {
                self.write_aligned_tick(writer, tick, value)?;
            } else {
                self.write_non_aligned_tick(writer, tick, value)?;
            }
            if (tick + 1) % checkpoint == 0 {
                debug!(
                    tick = tick + 1,
                    percent = (tick + 1) * 100 / self.points,
                    records = self.records,
                    "progress"
                );
            }
        }
        Ok(self.records)
    }

    /// One record per device carrying every sensor, stamped `tick + 1`.
    fn write_aligned_tick(
        &mut self,
        writer: &mut dyn TsWriter,
        tick: usize,
        value: tsbench_writer::SampleValue,
    ) -> Result<()> {
        let timestamp = tick as i64 + 1;
        for device in &self.devices {
            let mut record =
                TsRecord::with_capacity(timestamp, Arc::clone(device), self.sensors.len());
            for sensor in &self.sensors {
                record.add_point(Arc::clone(sensor), value);
            }
            writer
                .write(&record)
                .with_context(|| format!("Failed to write record for {} at {}", device, timestamp))?;
            self.records += 1;
        }
        Ok(())
    }

    /// One record per device and sensor, stamped `tick * sensors + sensor`.
    fn write_non_aligned_tick(
        &mut self,
        writer: &mut dyn TsWriter,
        tick: usize,
        value: tsbench_writer::SampleValue,
    ) -> Result<()> {
        let sensors = self.sensors.len() as i64;
        for device in &self.devices {
            for (k, sensor) in self.sensors.iter().enumerate() {
                let timestamp = tick as i64 * sensors + k as i64;
                let record = TsRecord::with_capacity(timestamp, Arc::clone(device), 1)
                    .with_point(Arc::clone(sensor), value);
                writer.write(&record).with_context(|| {
                    format!("Failed to write record for {} at {}", device, timestamp)
                })?;
                self.records += 1;
            }
        }
        Ok(())
    }

    /// Close the writer, flushing everything it buffered.
    pub fn finalize(&mut self, writer: &mut dyn TsWriter) -> Result<WriteSummary> {
        self.transition(DriverState::Writing, DriverState::Finalized)?;
        writer.close().context("Failed to close writer")
    }

    /// Run all three phases against `writer`.
    pub fn run(&mut self, writer: &mut dyn TsWriter) -> Result<WriteSummary> {
        self.initialize(writer)?;
        self.write(writer)?;
        self.finalize(writer)
    }
}

/// Run one trial against the configured backend and the process memory probe.
pub fn run_trial(config: &BenchConfig, points: usize) -> Result<TrialMetrics> {
    let destination = destination(config);
    let settings = writer_settings(config);
    run_trial_with(
        config,
        points,
        move || open_writer(&destination, settings),
        ProcessMemoryProbe::current(),
    )
}

/// Run one trial with a caller-supplied writer factory and memory probe.
///
/// Timing starts just before the monitor starts and ends right after the
/// writer closes; the monitor is stopped immediately afterwards, also when
/// the trial fails.
pub fn run_trial_with<F, P>(
    config: &BenchConfig,
    points: usize,
    open: F,
    probe: P,
) -> Result<TrialMetrics>
where
    F: FnOnce() -> tsbench_writer::Result<Box<dyn TsWriter>>,
    P: MemoryProbe,
{
    let started = Instant::now();
    let monitor = MemoryMonitor::start_with_probe(probe, config.run.monitor_interval())?;

    let outcome = (|| -> Result<(WriteSummary, u64)> {
        let mut writer = open().context("Failed to open writer")?;
        let mut driver = Driver::new(config, points);
        driver.initialize(writer.as_mut())?;
        let records = driver.write(writer.as_mut())?;
        let summary = driver.finalize(writer.as_mut())?;
        Ok((summary, records))
    })();
    let elapsed = started.elapsed();
    let memory = monitor.stop()?;
    let (summary, records) = outcome?;

    let workload = &config.workload;
    let metrics = TrialMetrics {
        points_per_column: points,
        total_points: total_points(workload, points),
        records,
        elapsed,
        peak_memory_bytes: memory.peak_bytes,
        output_bytes: summary.bytes,
    };
    info!(
        points,
        records,
        elapsed_ms = elapsed.as_millis() as u64,
        output_bytes = summary.bytes,
        peak_memory_bytes = memory.peak_bytes,
        "trial finished"
    );
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tsbench_config::Wave;
    use tsbench_writer::{DataType, SampleValue};

    /// Writer double that keeps every record it is handed.
    #[derive(Default)]
    struct RecordingWriter {
        fields: Vec<FieldDescriptor>,
        records: Arc<Mutex<Vec<TsRecord>>>,
        closed: bool,
    }

    impl TsWriter for RecordingWriter {
        fn register_field(&mut self, field: FieldDescriptor) -> tsbench_writer::Result<()> {
            self.fields.push(field);
            Ok(())
        }

        fn write(&mut self, record: &TsRecord) -> tsbench_writer::Result<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        fn close(&mut self) -> tsbench_writer::Result<WriteSummary> {
            self.closed = true;
            Ok(WriteSummary {
                records: self.records.lock().unwrap().len() as u64,
                bytes: 0,
            })
        }
    }

    fn config(aligned: bool) -> BenchConfig {
        let mut config = BenchConfig::default();
        config.workload.devices = 2;
        config.workload.sensors = 2;
        config.workload.points = vec![3];
        config.workload.data_type = DataType::Int32;
        config.workload.wave = Wave::Linear;
        config.workload.aligned = aligned;
        config
    }

    fn timestamps_for(records: &[TsRecord], device: &str) -> Vec<i64> {
        records
            .iter()
            .filter(|r| &*r.device == device)
            .map(|r| r.timestamp)
            .collect()
    }

    #[test]
    fn phases_run_in_order() {
        let config = config(true);
        let mut writer = RecordingWriter::default();
        let mut driver = Driver::new(&config, 3);
        assert_eq!(driver.state(), DriverState::Idle);

        assert!(driver.write(&mut writer).is_err());
        driver.initialize(&mut writer).unwrap();
        assert_eq!(driver.state(), DriverState::Initializing);
        assert_eq!(writer.fields.len(), 2);
        assert_eq!(writer.fields[1].name, "sensor_1");

        driver.write(&mut writer).unwrap();
        assert_eq!(driver.state(), DriverState::Writing);
        driver.finalize(&mut writer).unwrap();
        assert_eq!(driver.state(), DriverState::Finalized);
        assert!(writer.closed);
        assert!(driver.finalize(&mut writer).is_err());
    }

    #[test]
    fn aligned_layout() {
        let config = config(true);
        let mut writer = RecordingWriter::default();
        let summary = Driver::new(&config, 3).run(&mut writer).unwrap();

        let records = writer.records.lock().unwrap();
        assert_eq!(summary.records, 6);
        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|r| r.points.len() == 2));
        assert_eq!(timestamps_for(&records, "device_0"), vec![1, 2, 3]);
        assert_eq!(timestamps_for(&records, "device_1"), vec![1, 2, 3]);
    }

    #[test]
    fn non_aligned_layout() {
        let config = config(false);
        let mut writer = RecordingWriter::default();
        Driver::new(&config, 3).run(&mut writer).unwrap();

        let records = writer.records.lock().unwrap();
        assert_eq!(records.len(), 12);
        assert!(records.iter().all(|r| r.points.len() == 1));
        assert_eq!(timestamps_for(&records, "device_0"), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(timestamps_for(&records, "device_1"), vec![0, 1, 2, 3, 4, 5]);

        // Field k of tick t lands at t * sensors + k.
        for record in records.iter() {
            let field: i64 = record.points[0].measurement["sensor_".len()..]
                .parse()
                .unwrap();
            assert_eq!(record.timestamp % 2, field);
        }
    }

    #[test]
    fn one_sample_per_tick_shared_by_all_points() {
        let config = config(true);
        let mut writer = RecordingWriter::default();
        Driver::new(&config, 3).run(&mut writer).unwrap();

        let records = writer.records.lock().unwrap();
        for record in records.iter() {
            // Linear wave with step 1: tick t carries value t.
            let expected = SampleValue::I32((record.timestamp - 1) as i32);
            assert!(record.points.iter().all(|p| p.value == expected));
        }
    }

    #[test]
    #[allow(arithmetic_overflow)]
    fn total_points_widens_before_multiplying() {
        let mut config = config(true);
        config.workload.devices = u32::MAX as usize;
        config.workload.sensors = u32::MAX as usize;
        assert_eq!(
            total_points(&config.workload, 2),
            (u32::MAX as u64) * (u32::MAX as u64) * 2
        );
        config.workload.devices = usize::MAX;
        assert_eq!(total_points(&config.workload, 2), u64::MAX);
    }

    #[test]
    fn trial_reports_points_and_memory() {
        struct FixedProbe;
        impl MemoryProbe for FixedProbe {
            fn sample(&mut self) -> Option<u64> {
                Some(4096)
            }
        }

        let config = config(false);
        let metrics = run_trial_with(
            &config,
            3,
            || Ok(Box::new(RecordingWriter::default()) as Box<dyn TsWriter>),
            FixedProbe,
        )
        .unwrap();

        assert_eq!(metrics.total_points, 12);
        assert_eq!(metrics.records, 12);
        assert_eq!(metrics.peak_memory_bytes, 4096);
        assert!(metrics.throughput() > 0.0);
    }

    #[test]
    fn open_failure_aborts_trial() {
        struct FixedProbe;
        impl MemoryProbe for FixedProbe {
            fn sample(&mut self) -> Option<u64> {
                None
            }
        }

        let config = config(true);
        let err = run_trial_with(
            &config,
            3,
            || Err(tsbench_writer::WriterError::invalid_config("boom")),
            FixedProbe,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("boom"));
    }
}
