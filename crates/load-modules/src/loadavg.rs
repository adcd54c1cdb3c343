//! Running mean of the system load average.

use crate::error::LoadError;
use parking_lot::Mutex;

/// Source of instantaneous load readings.
pub trait LoadSource: Send + Sync {
    fn read(&self) -> Result<f64, LoadError>;
}

/// One-minute load average of the host (first field of `/proc/loadavg`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLoadSource;

impl LoadSource for SystemLoadSource {
    fn read(&self) -> Result<f64, LoadError> {
        let load = sysinfo::System::load_average().one;
        if load.is_finite() && load >= 0.0 {
            Ok(load)
        } else {
            Err(LoadError::LoadAverage(format!("invalid reading {load}")))
        }
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    sum: f64,
    samples: u64,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.samples += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.sum / self.samples as f64)
    }
}

/// Lock-protected sum/count accumulator over a [`LoadSource`].
pub struct LoadAverage {
    source: Box<dyn LoadSource>,
    acc: Mutex<Accumulator>,
}

impl Default for LoadAverage {
    fn default() -> Self {
        Self::new(Box::new(SystemLoadSource))
    }
}

impl LoadAverage {
    pub fn new(source: Box<dyn LoadSource>) -> Self {
        Self {
            source,
            acc: Mutex::new(Accumulator::default()),
        }
    }

    /// Take one reading and fold it into the mean.
    pub fn sample(&self) -> Result<f64, LoadError> {
        let value = self.source.read()?;
        self.acc.lock().add(value);
        Ok(value)
    }

    /// Current mean, taking a first reading if none exists yet.
    pub fn mean(&self) -> Result<f64, LoadError> {
        let mut acc = self.acc.lock();
        if acc.samples == 0 {
            let value = self.source.read()?;
            acc.add(value);
        }
        Ok(acc.sum / acc.samples as f64)
    }

    /// Current mean without sampling; `None` before the first reading.
    pub fn current_mean(&self) -> Option<f64> {
        self.acc.lock().mean()
    }

    pub fn samples(&self) -> u64 {
        self.acc.lock().samples
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Replays fixed readings, repeating the last one.
    pub(crate) struct ScriptedSource {
        readings: Vec<f64>,
        next: AtomicUsize,
    }

    impl ScriptedSource {
        pub(crate) fn new(readings: Vec<f64>) -> Self {
            Self {
                readings,
                next: AtomicUsize::new(0),
            }
        }
    }

    impl LoadSource for ScriptedSource {
        fn read(&self) -> Result<f64, LoadError> {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            self.readings
                .get(i)
                .or_else(|| self.readings.last())
                .copied()
                .ok_or_else(|| LoadError::LoadAverage("no readings".to_string()))
        }
    }

    #[test]
    fn test_mean_undefined_before_samples() {
        let avg = LoadAverage::new(Box::new(ScriptedSource::new(vec![2.0])));
        assert_eq!(avg.current_mean(), None);
        assert_eq!(avg.samples(), 0);
    }

    #[test]
    fn test_mean_of_samples() {
        let readings = vec![0.5, 1.25, 3.0, 0.0, 2.75];
        let avg = LoadAverage::new(Box::new(ScriptedSource::new(readings.clone())));
        for _ in &readings {
            avg.sample().unwrap();
        }
        let expected = readings.iter().sum::<f64>() / readings.len() as f64;
        assert!((avg.mean().unwrap() - expected).abs() < 1e-12);
        assert_eq!(avg.samples(), 5);
    }

    #[test]
    fn test_mean_samples_lazily_once() {
        let avg = LoadAverage::new(Box::new(ScriptedSource::new(vec![4.0, 8.0])));
        assert_eq!(avg.mean().unwrap(), 4.0);
        assert_eq!(avg.mean().unwrap(), 4.0);
        assert_eq!(avg.samples(), 1);
    }

    #[test]
    fn test_failed_source_propagates() {
        let avg = LoadAverage::new(Box::new(ScriptedSource::new(vec![])));
        assert!(avg.sample().is_err());
        assert!(avg.mean().is_err());
        assert_eq!(avg.samples(), 0);
    }

    #[test]
    fn test_concurrent_samples_are_all_counted() {
        let avg = Arc::new(LoadAverage::new(Box::new(ScriptedSource::new(vec![1.0]))));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let avg = Arc::clone(&avg);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        avg.sample().unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(avg.samples(), 800);
        assert_eq!(avg.mean().unwrap(), 1.0);
    }

    #[test]
    fn test_system_source_reads() {
        // Non-Linux hosts report zero, which is still a valid reading.
        assert!(SystemLoadSource.read().unwrap() >= 0.0);
    }
}
