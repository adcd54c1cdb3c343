//! Load generators for loadeval.
//!
//! Every load module runs on its own thread and walks the same lifecycle:
//!
//! ```text
//! Created -> Preparing -> Building -> AwaitingStart -> Running -> Stopped
//!     \__________\____________\_____________\_____________/
//!                       stop signal (any state)
//! ```
//!
//! Modules only implement the three phases (`setup`, `build`, `run_load`);
//! [`LoadThread`] supplies the signal checks between them and the start
//! barrier. A [`LoadGroup`] owns all workers of one run, releases them into
//! the measurement window together, samples the system load average and folds
//! the worker reports into a single `loads` node.
//!
//! # Example
//!
//! ```ignore
//! use load_modules::{LoadGroup, LoadParams, ModuleRegistry};
//!
//! let registry = ModuleRegistry::with_builtin();
//! let mut group = LoadGroup::new();
//! group.setup(&registry, &loads_section, &LoadParams::default())?;
//! group.start();
//! group.wait_ready(Duration::from_secs(300));
//! group.release_all();
//! // ... measurement window ...
//! group.stop_all();
//! let summary = group.join();
//! let loads = group.build_report();
//! ```

pub mod builtin;
pub mod error;
pub mod group;
pub mod loadavg;
pub mod params;
pub mod registry;
pub mod signals;
pub mod state;
pub mod worker;

pub use error::LoadError;
pub use group::{JoinSummary, LoadGroup, WorkerOutcome};
pub use loadavg::{LoadAverage, LoadSource, SystemLoadSource};
pub use params::{LoadParams, MemSize};
pub use registry::{ModuleFactory, ModuleRegistry};
pub use signals::{LoadSignals, StartOutcome};
pub use state::{LoadState, WorkerStatus};
pub use worker::{JobRecord, LoadContext, LoadModule, LoadThread};
