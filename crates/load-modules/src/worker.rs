//! The per-worker lifecycle state machine.

use crate::error::LoadError;
use crate::params::LoadParams;
use crate::signals::{LoadSignals, StartOutcome};
use crate::state::{LoadState, WorkerStatus};
use report_doc::Node;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long one wait at the start barrier lasts before re-checking stop.
pub const START_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Jobs launched by a module during its run phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobRecord {
    pub jobs: usize,
    pub args: Vec<String>,
}

impl JobRecord {
    pub fn set(&mut self, jobs: usize, args: Vec<String>) {
        self.jobs = jobs;
        self.args = args;
    }

    /// `<command_line name=".." job_instances="N">args</command_line>`, or
    /// nothing when no job ran.
    pub fn command_line_report(&self, name: &str) -> Option<Node> {
        if self.jobs == 0 || self.args.is_empty() {
            return None;
        }
        Some(
            Node::leaf("command_line", self.args.join(" "))
                .with_attribute("name", name)
                .with_attribute("job_instances", self.jobs),
        )
    }
}

/// What a module sees of its worker while a phase runs.
pub struct LoadContext<'a> {
    name: &'a str,
    params: &'a LoadParams,
    signals: &'a LoadSignals,
}

impl<'a> LoadContext<'a> {
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn params(&self) -> &LoadParams {
        self.params
    }

    /// Stop flag; modules poll this during `run_load`.
    pub fn should_stop(&self) -> bool {
        self.signals.should_stop()
    }

    /// Sleep up to `timeout` or until stop is requested. Returns the stop flag.
    pub fn wait_for_stop(&self, timeout: Duration) -> bool {
        self.signals.wait_for_stop(timeout)
    }

    /// Path of this worker's private log file `<reportdir>/logs/<name>-<suffix>.log`.
    pub fn logfile_path(&self, suffix: &str) -> PathBuf {
        self.params
            .log_dir()
            .join(format!("{}-{}.log", self.name, suffix))
    }

    /// Create (or append to) this worker's private log file.
    pub fn open_logfile(&self, suffix: &str) -> std::io::Result<File> {
        std::fs::create_dir_all(self.params.log_dir())?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.logfile_path(suffix))
    }
}

/// A unit of load-generation logic.
///
/// `setup` and `build` run once before the measurement window and default to
/// no-ops. `run_load` must return once it finishes or once
/// [`LoadContext::should_stop`] turns true; nothing preempts it.
pub trait LoadModule: Send {
    fn setup(&mut self, _ctx: &LoadContext<'_>) -> Result<(), LoadError> {
        Ok(())
    }

    fn build(&mut self, _ctx: &LoadContext<'_>) -> Result<(), LoadError> {
        Ok(())
    }

    fn run_load(&mut self, ctx: &LoadContext<'_>, jobs: &mut JobRecord) -> Result<(), LoadError>;

    /// Report fragment for this module, `None` if it has nothing to report.
    fn make_report(&self, name: &str, jobs: &JobRecord) -> Option<Node> {
        jobs.command_line_report(name)
    }
}

/// A named load module together with its parameters, signals and status.
pub struct LoadThread {
    name: String,
    params: LoadParams,
    module: Box<dyn LoadModule>,
    signals: Arc<LoadSignals>,
    status: Arc<WorkerStatus>,
    jobs: JobRecord,
}

impl std::fmt::Debug for LoadThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadThread")
            .field("name", &self.name)
            .field("state", &self.status.state())
            .field("jobs", &self.jobs)
            .finish()
    }
}

impl LoadThread {
    /// Create a worker. The build directory is created if it does not exist.
    pub fn new(
        name: impl Into<String>,
        params: LoadParams,
        module: Box<dyn LoadModule>,
    ) -> Result<Self, LoadError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LoadError::InvalidName);
        }
        std::fs::create_dir_all(&params.builddir)?;

        Ok(Self {
            name,
            params,
            module,
            signals: Arc::new(LoadSignals::new()),
            status: Arc::new(WorkerStatus::default()),
            jobs: JobRecord::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &LoadParams {
        &self.params
    }

    pub fn signals(&self) -> Arc<LoadSignals> {
        Arc::clone(&self.signals)
    }

    pub fn status(&self) -> Arc<WorkerStatus> {
        Arc::clone(&self.status)
    }

    pub fn state(&self) -> LoadState {
        self.status.state()
    }

    pub fn is_ready(&self) -> bool {
        self.status.is_ready()
    }

    pub fn jobs(&self) -> &JobRecord {
        &self.jobs
    }

    pub fn should_start(&self) -> bool {
        self.signals.should_start()
    }

    pub fn should_stop(&self) -> bool {
        self.signals.should_stop()
    }

    pub fn make_report(&self) -> Option<Node> {
        self.module.make_report(&self.name, &self.jobs)
    }

    /// Walk the lifecycle on the current thread. Always ends in `Stopped`.
    pub fn run(&mut self) -> Result<(), LoadError> {
        let result = self.drive();
        self.status.set_state(LoadState::Stopped);
        match &result {
            Ok(()) => debug!(module = %self.name, "Load stopped"),
            Err(e) => warn!(module = %self.name, "Load failed: {}", e),
        }
        result
    }

    fn drive(&mut self) -> Result<(), LoadError> {
        let ctx = LoadContext {
            name: &self.name,
            params: &self.params,
            signals: &self.signals,
        };

        if ctx.should_stop() {
            debug!(module = %self.name, "Stopped before setup");
            return Ok(());
        }
        self.status.set_state(LoadState::Preparing);
        debug!(module = %self.name, "Preparing");
        self.module.setup(&ctx)?;

        if ctx.should_stop() {
            return Ok(());
        }
        self.status.set_state(LoadState::Building);
        debug!(module = %self.name, "Building");
        self.module.build(&ctx)?;

        if ctx.should_stop() {
            return Ok(());
        }
        self.status.set_state(LoadState::AwaitingStart);
        self.status.mark_ready();
        debug!(module = %self.name, "Ready, waiting for start");

        match self.signals.wait_for_start(START_POLL_INTERVAL) {
            StartOutcome::Stopped => return Ok(()),
            StartOutcome::Started => {}
        }

        self.status.set_state(LoadState::Running);
        info!(module = %self.name, "Starting load");
        self.module.run_load(&ctx, &mut self.jobs)
    }
}
