//! loadeval library
//!
//! Runs a set of synthetic system loads over a fixed measurement window and
//! writes one hierarchical report per run.
//!
//! # Run flow
//!
//! 1. A report directory `loadeval-YYYYMMDD-N/` (with `logs/`) is created
//!    under the work directory.
//! 2. Every configured load module is instantiated and started on its own
//!    thread; each prepares and builds, then waits at the start barrier.
//! 3. Once all loads are ready they are released together and the load
//!    average is sampled for the length of the window.
//! 4. Loads are stopped and joined; the report (`run_info`, `system`,
//!    `loads`) is written to `summary.xml` and optionally archived.
//!
//! # CLI Usage
//!
//! ```bash
//! # Ten minutes of hackbench plus a stress-ng cpu stressor
//! loadeval run --duration 10m --load hackbench --load stressng
//!
//! # Everything from a config file, archived afterwards
//! loadeval run --config loadeval.yaml --archive
//!
//! # Available modules
//! loadeval modules
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod report_dir;
pub mod run;
pub mod run_info;
pub mod sysinfo_report;

pub use config::Config;
pub use run::{assemble_report, run, ReportInputs, RunError, RunOutcome};
