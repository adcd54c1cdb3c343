//! In-process CPU load without external binaries.

use crate::error::LoadError;
use crate::params::LoadParams;
use crate::worker::{JobRecord, LoadContext, LoadModule};
use std::hint::black_box;
use std::time::{Duration, Instant};
use tracing::info;

/// Iterations between stop checks in the busy loop.
const SPIN_BATCH: u64 = 100_000;

/// Keeps `threads` cores busy until stop, or until `max_runtime` elapses.
#[derive(Debug, Clone)]
pub struct CpuSpin {
    threads: usize,
    max_runtime: Option<Duration>,
}

impl CpuSpin {
    pub fn new(threads: usize, max_runtime: Option<Duration>) -> Self {
        Self {
            threads,
            max_runtime,
        }
    }

    /// `cpuspin` module: keys `threads` (defaults to `numcores`) and
    /// `max_runtime` in seconds.
    pub fn from_params(params: &LoadParams) -> Result<Box<dyn LoadModule>, LoadError> {
        let threads = match params.get_u64("threads")? {
            Some(0) => {
                return Err(LoadError::InvalidConfig(
                    "cpuspin 'threads' must be at least 1".to_string(),
                ))
            }
            Some(n) => n as usize,
            None => params.numcores,
        };
        let max_runtime = params.get_u64("max_runtime")?.map(Duration::from_secs);
        Ok(Box::new(Self::new(threads, max_runtime)))
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "cpuspin".to_string(),
            "--threads".to_string(),
            self.threads.to_string(),
        ];
        if let Some(limit) = self.max_runtime {
            args.push("--max-runtime".to_string());
            args.push(format!("{}s", limit.as_secs()));
        }
        args
    }
}

impl LoadModule for CpuSpin {
    fn run_load(&mut self, ctx: &LoadContext<'_>, jobs: &mut JobRecord) -> Result<(), LoadError> {
        jobs.set(self.threads, self.args());
        info!(module = %ctx.name(), "Spinning on {} thread(s)", self.threads);

        let deadline = self.max_runtime.map(|limit| Instant::now() + limit);
        std::thread::scope(|scope| {
            for _ in 0..self.threads {
                scope.spawn(|| spin(ctx, deadline));
            }
        });
        Ok(())
    }
}

fn spin(ctx: &LoadContext<'_>, deadline: Option<Instant>) {
    let mut x: u64 = 1;
    loop {
        for _ in 0..SPIN_BATCH {
            x = black_box(x.wrapping_mul(6364136223846793005).wrapping_add(1));
        }
        if ctx.should_stop() || deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
    }
}
