//! Background sampling of process memory during a trial.

use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::debug;

/// Source of memory readings, in bytes.
pub trait MemoryProbe: Send + 'static {
    /// Current usage, or `None` when the reading is unavailable.
    fn sample(&mut self) -> Option<u64>;
}

/// Resident set size of the current process
pub struct ProcessMemoryProbe {
    system: System,
    pid: Pid,
}

impl ProcessMemoryProbe {
    pub fn current() -> Self {
        Self {
            system: System::new(),
            pid: Pid::from_u32(std::process::id()),
        }
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn sample(&mut self) -> Option<u64> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        self.system.process(self.pid).map(|p| p.memory())
    }
}

/// What the sampler observed over its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub peak_bytes: u64,
    pub samples: u64,
}

/// Running sampler thread.
///
/// Samples once on start and then every `interval` until [`stop`] is called.
/// The stop signal is checked between samples, so the thread never samples
/// after it has seen the signal.
///
/// [`stop`]: MemoryMonitor::stop
pub struct MemoryMonitor {
    stop_tx: Sender<()>,
    handle: JoinHandle<MemoryStats>,
    peak: Arc<AtomicU64>,
}

impl MemoryMonitor {
    pub fn start_with_probe<P: MemoryProbe>(mut probe: P, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let peak = Arc::new(AtomicU64::new(0));
        let shared_peak = Arc::clone(&peak);

        let handle = std::thread::Builder::new()
            .name("memory-monitor".to_string())
            .spawn(move || {
                let mut stats = MemoryStats {
                    peak_bytes: 0,
                    samples: 0,
                };
                loop {
                    if let Some(bytes) = probe.sample() {
                        stats.samples += 1;
                        if bytes > stats.peak_bytes {
                            stats.peak_bytes = bytes;
                            shared_peak.store(bytes, Ordering::Relaxed);
                        }
                    }
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                stats
            })
            .context("Failed to spawn memory monitor thread")?;

        Ok(Self {
            stop_tx,
            handle,
            peak,
        })
    }

    /// Highest reading published so far. Never decreases.
    pub fn peak_so_far(&self) -> u64 {
        self.peak.load(Ordering::Relaxed)
    }

    /// Signal the sampler, wait for it to exit, and return its readings.
    pub fn stop(self) -> Result<MemoryStats> {
        // A send error means the thread is already gone; join reports why.
        let _ = self.stop_tx.send(());
        let stats = self
            .handle
            .join()
            .map_err(|_| anyhow!("memory monitor thread panicked"))?;
        debug!(
            peak_bytes = stats.peak_bytes,
            samples = stats.samples,
            "memory monitor stopped"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Replays a fixed series of readings and counts calls.
    struct ScriptedProbe {
        readings: Vec<u64>,
        calls: Arc<AtomicUsize>,
    }

    impl MemoryProbe for ScriptedProbe {
        fn sample(&mut self) -> Option<u64> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.readings.get(n % self.readings.len()).copied()
        }
    }

    #[test]
    fn reports_maximum_reading() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = ScriptedProbe {
            readings: vec![100, 300, 200, 50],
            calls: Arc::clone(&calls),
        };
        let monitor = MemoryMonitor::start_with_probe(probe, Duration::from_millis(1)).unwrap();
        while calls.load(Ordering::SeqCst) < 8 {
            std::thread::sleep(Duration::from_millis(1));
        }
        let stats = monitor.stop().unwrap();
        assert_eq!(stats.peak_bytes, 300);
        assert!(stats.samples >= 8);
    }

    #[test]
    fn peak_never_decreases() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = ScriptedProbe {
            readings: vec![10, 40, 20, 80, 30, 5],
            calls: Arc::clone(&calls),
        };
        let monitor = MemoryMonitor::start_with_probe(probe, Duration::from_millis(1)).unwrap();

        let mut last = 0;
        for _ in 0..50 {
            let peak = monitor.peak_so_far();
            assert!(peak >= last);
            last = peak;
            std::thread::sleep(Duration::from_millis(1));
        }
        let stats = monitor.stop().unwrap();
        assert!(stats.peak_bytes >= last);
    }

    #[test]
    fn no_samples_after_stop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = ScriptedProbe {
            readings: vec![1],
            calls: Arc::clone(&calls),
        };
        let monitor = MemoryMonitor::start_with_probe(probe, Duration::from_millis(1)).unwrap();
        std::thread::sleep(Duration::from_millis(10));
        let stats = monitor.stop().unwrap();

        let after_stop = calls.load(Ordering::SeqCst);
        assert_eq!(after_stop as u64, stats.samples);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn stop_interrupts_long_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = ScriptedProbe {
            readings: vec![7],
            calls: Arc::clone(&calls),
        };
        let monitor = MemoryMonitor::start_with_probe(probe, Duration::from_secs(3600)).unwrap();
        let started = std::time::Instant::now();
        let stats = monitor.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(60));
        assert!(stats.samples <= 1);
    }

    #[test]
    fn process_probe_reads_memory() {
        let mut probe = ProcessMemoryProbe::current();
        assert!(probe.sample().unwrap_or(0) > 0);
    }
}
