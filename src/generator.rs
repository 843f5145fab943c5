//! Synthetic sample generation.
//!
//! A [`DataGenerator`] is an endless, stateful sequence: every call advances
//! one step. Random waves are seeded from the workload, so the same
//! configuration always produces the same sequence. Start over by building a
//! new generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tsbench_config::{Wave, WorkloadConfig};
use tsbench_writer::{DataType, SampleValue};

pub struct DataGenerator {
    wave: Wave,
    data_type: DataType,
    amplitude: f64,
    period: u64,
    step: f64,
    n: u64,
    walk: f64,
    rng: StdRng,
}

impl DataGenerator {
    pub fn new(workload: &WorkloadConfig) -> Self {
        Self {
            wave: workload.wave,
            data_type: workload.data_type,
            amplitude: workload.amplitude.abs(),
            period: workload.period.max(1),
            step: workload.step.abs(),
            n: 0,
            walk: 0.0,
            rng: StdRng::seed_from_u64(workload.seed),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Produce the next sample and advance.
    pub fn next_value(&mut self) -> SampleValue {
        let raw = self.next_raw();
        self.n = self.n.wrapping_add(1);
        SampleValue::cast(raw, self.data_type)
    }

    fn next_raw(&mut self) -> f64 {
        match self.wave {
            Wave::Constant => self.amplitude,
            Wave::Linear => self.n as f64 * self.step,
            Wave::Sine => {
                let phase = (self.n % self.period) as f64 / self.period as f64;
                self.amplitude * (2.0 * PI * phase).sin()
            }
            Wave::Square => {
                if (self.n % self.period) * 2 < self.period {
                    self.amplitude
                } else {
                    -self.amplitude
                }
            }
            Wave::RandomWalk => {
                if self.n > 0 {
                    self.walk += self.step * self.unit();
                }
                self.walk
            }
            Wave::Random => self.amplitude * self.unit(),
        }
    }

    /// Uniform sample in `[-1, 1)`, scaled by the caller.
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>() * 2.0 - 1.0
    }
}

impl Iterator for DataGenerator {
    type Item = SampleValue;

    fn next(&mut self) -> Option<SampleValue> {
        Some(self.next_value())
    }
}
