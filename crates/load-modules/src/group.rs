//! Owner of all load workers for one measurement run.

use crate::error::LoadError;
use crate::loadavg::LoadAverage;
use crate::params::LoadParams;
use crate::registry::ModuleRegistry;
use crate::signals::LoadSignals;
use crate::state::{LoadState, WorkerStatus};
use crate::worker::LoadThread;
use report_doc::Node;
use serde_yaml::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Report tag of the aggregate node.
pub const REPORT_TAG: &str = "loads";

type ThreadResult = (Box<LoadThread>, Result<(), LoadError>);

enum Slot {
    Idle(Box<LoadThread>),
    Running(JoinHandle<ThreadResult>),
    Finished {
        worker: Box<LoadThread>,
        error: Option<LoadError>,
    },
    /// The worker itself is gone (thread could not be spawned or died outside
    /// the lifecycle).
    Lost(LoadError),
    Empty,
}

struct Entry {
    name: String,
    signals: Arc<LoadSignals>,
    status: Arc<WorkerStatus>,
    slot: Slot,
    /// Stopped by [`LoadGroup::abandon_unready`] before it became ready.
    abandoned: bool,
}

/// Terminal state of one worker after [`LoadGroup::join`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerOutcome {
    pub name: String,
    pub state: LoadState,
    pub error: Option<String>,
}

/// Result of [`LoadGroup::join`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinSummary {
    pub outcomes: Vec<WorkerOutcome>,
}

impl JoinSummary {
    pub fn failures(&self) -> impl Iterator<Item = &WorkerOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// A set of load workers started, released and stopped together.
pub struct LoadGroup {
    entries: Vec<Entry>,
    loadavg: Arc<LoadAverage>,
    released: AtomicBool,
    stopped: AtomicBool,
}

impl Default for LoadGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadGroup {
    /// Group sampling the host load average.
    pub fn new() -> Self {
        Self::with_load_average(Arc::new(LoadAverage::default()))
    }

    pub fn with_load_average(loadavg: Arc<LoadAverage>) -> Self {
        Self {
            entries: Vec::new(),
            loadavg,
            released: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Instantiate every module listed in `section`.
    ///
    /// `section` maps worker names to module sections. A section may be the
    /// string `module` (enable with defaults), `null`, or a mapping whose
    /// optional `module` key names the registered module (defaults to the
    /// worker name) and whose `enabled: false` skips it. Returns the number of
    /// workers added.
    pub fn setup(
        &mut self,
        registry: &ModuleRegistry,
        section: &Value,
        common: &LoadParams,
    ) -> Result<usize, LoadError> {
        let mapping = section.as_mapping().ok_or_else(|| {
            LoadError::InvalidConfig("load module configuration is not a mapping".to_string())
        })?;

        let mut added = 0;
        for (key, value) in mapping {
            let name = key.as_str().ok_or_else(|| {
                LoadError::InvalidConfig(format!("load module name is not a string: {key:?}"))
            })?;

            let mut module_section = match value {
                Value::String(s) if s.eq_ignore_ascii_case("module") => Value::Null,
                Value::String(s) => {
                    return Err(LoadError::InvalidConfig(format!(
                        "load module '{name}': expected 'module' or a mapping, got '{s}'"
                    )))
                }
                other => other.clone(),
            };

            let mut module = name.to_string();
            if let Value::Mapping(m) = &mut module_section {
                if let Some(enabled) = m.remove("enabled") {
                    match enabled {
                        Value::Bool(false) => {
                            debug!(module = %name, "Disabled in configuration");
                            continue;
                        }
                        Value::Bool(true) => {}
                        other => {
                            return Err(LoadError::InvalidConfig(format!(
                                "load module '{name}': 'enabled' must be a boolean, got {other:?}"
                            )))
                        }
                    }
                }
                if let Some(m) = m.remove("module") {
                    module = m
                        .as_str()
                        .ok_or_else(|| {
                            LoadError::InvalidConfig(format!(
                                "load module '{name}': 'module' must be a string"
                            ))
                        })?
                        .to_string();
                }
            }

            let params = LoadParams::from_section(&module_section, common)?;
            let worker = registry.create(&module, name, params)?;
            self.add(worker)?;
            info!(module = %name, "Loaded load module '{}'", module);
            added += 1;
        }
        Ok(added)
    }

    /// Add a constructed worker. Names must be unique within the group.
    pub fn add(&mut self, worker: LoadThread) -> Result<(), LoadError> {
        if self.entries.iter().any(|e| e.name == worker.name()) {
            return Err(LoadError::DuplicateWorker(worker.name().to_string()));
        }
        self.entries.push(Entry {
            name: worker.name().to_string(),
            signals: worker.signals(),
            status: worker.status(),
            slot: Slot::Idle(Box::new(worker)),
            abandoned: false,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn load_average(&self) -> &Arc<LoadAverage> {
        &self.loadavg
    }

    /// Start every idle worker on its own thread. Returns how many started.
    ///
    /// A worker whose thread cannot be spawned is recorded as failed and
    /// reported by [`join`](Self::join); the others still start.
    pub fn start(&mut self) -> usize {
        let mut started = 0;
        for entry in &mut self.entries {
            let mut worker = match std::mem::replace(&mut entry.slot, Slot::Empty) {
                Slot::Idle(worker) => worker,
                other => {
                    entry.slot = other;
                    continue;
                }
            };

            let spawned = thread::Builder::new()
                .name(format!("load-{}", entry.name))
                .spawn(move || {
                    let result = match panic::catch_unwind(AssertUnwindSafe(|| worker.run())) {
                        Ok(result) => result,
                        Err(payload) => {
                            worker.status().set_state(LoadState::Stopped);
                            Err(LoadError::Panicked(panic_message(payload.as_ref())))
                        }
                    };
                    (worker, result)
                });

            entry.slot = match spawned {
                Ok(handle) => {
                    started += 1;
                    Slot::Running(handle)
                }
                Err(e) => {
                    error!(module = %entry.name, "Failed to spawn load thread: {}", e);
                    entry.status.set_state(LoadState::Stopped);
                    Slot::Lost(LoadError::Io(e))
                }
            };
        }
        info!("Started {} load module(s)", started);
        started
    }

    /// Whether every started worker finished setup and build (or already
    /// terminated). Idle workers count as not ready.
    pub fn is_ready(&self) -> bool {
        self.entries.iter().all(|e| match e.slot {
            Slot::Idle(_) | Slot::Empty => false,
            Slot::Running(_) => e.status.is_ready() || e.status.is_stopped(),
            Slot::Finished { .. } | Slot::Lost(_) => true,
        })
    }

    /// Poll [`is_ready`](Self::is_ready) until it holds or `timeout` elapses.
    pub fn wait_ready(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_ready() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(50));
        }
    }

    /// Stop every started worker that is not ready yet and return its name.
    ///
    /// Abandoned workers are reported as failed by [`join`](Self::join) and
    /// in [`build_report`](Self::build_report). The rest of the group can
    /// still be released.
    pub fn abandon_unready(&mut self) -> Vec<String> {
        let mut abandoned = Vec::new();
        for entry in &mut self.entries {
            let late = matches!(entry.slot, Slot::Running(_))
                && !entry.abandoned
                && !entry.status.is_ready()
                && !entry.status.is_stopped();
            if late {
                entry.signals.set_stop();
                entry.abandoned = true;
                warn!(module = %entry.name, "Not ready in time, stopping");
                abandoned.push(entry.name.clone());
            }
        }
        abandoned
    }

    /// Lifecycle state of each worker, in insertion order.
    pub fn states(&self) -> Vec<(String, LoadState)> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.status.state()))
            .collect()
    }

    /// Set every worker's start signal. Only the first call does anything;
    /// it returns `true`.
    ///
    /// Readiness is not checked here: callers that need a rendezvous wait on
    /// [`wait_ready`](Self::wait_ready) first.
    pub fn release_all(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        for entry in &self.entries {
            entry.signals.set_start();
        }
        info!("Released {} load module(s)", self.entries.len());
        true
    }

    /// Set every worker's stop signal. Repeated calls have no further effect;
    /// only the first returns `true`.
    pub fn stop_all(&self) -> bool {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }
        for entry in &self.entries {
            entry.signals.set_stop();
        }
        info!("Stopping {} load module(s)", self.entries.len());
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Wait for every worker thread to finish and collect the outcomes.
    ///
    /// Only running workers are joined; calling this again, or before
    /// [`start`](Self::start), reports the workers as they are.
    ///
    /// Workers that failed or panicked do not affect their siblings; their
    /// errors are listed in the returned summary.
    pub fn join(&mut self) -> JoinSummary {
        for entry in &mut self.entries {
            let handle = match std::mem::replace(&mut entry.slot, Slot::Empty) {
                Slot::Running(handle) => handle,
                other => {
                    entry.slot = other;
                    continue;
                }
            };
            entry.slot = match handle.join() {
                Ok((worker, result)) => {
                    let error = match result {
                        Err(e) => Some(e),
                        Ok(()) if entry.abandoned => Some(LoadError::NotReady),
                        Ok(()) => None,
                    };
                    Slot::Finished { worker, error }
                }
                Err(payload) => {
                    entry.status.set_state(LoadState::Stopped);
                    Slot::Lost(LoadError::Panicked(panic_message(payload.as_ref())))
                }
            };
        }

        let outcomes: Vec<WorkerOutcome> = self
            .entries
            .iter()
            .map(|e| WorkerOutcome {
                name: e.name.clone(),
                state: e.status.state(),
                error: match &e.slot {
                    Slot::Finished {
                        error: Some(err), ..
                    }
                    | Slot::Lost(err) => Some(err.to_string()),
                    _ => None,
                },
            })
            .collect();

        for failed in outcomes.iter().filter(|o| o.error.is_some()) {
            warn!(
                module = %failed.name,
                "Load module failed: {}",
                failed.error.as_deref().unwrap_or_default()
            );
        }
        JoinSummary { outcomes }
    }

    /// Take one load-average reading.
    pub fn sample_load_metric(&self) -> Result<f64, LoadError> {
        self.loadavg.sample()
    }

    /// Mean load average, sampling once if nothing was sampled yet.
    pub fn mean_load_metric(&self) -> Result<f64, LoadError> {
        self.loadavg.mean()
    }

    /// Aggregate report node.
    ///
    /// Contains each worker's fragment in insertion order (workers with
    /// nothing to report are omitted), a `load_failure` leaf per failed
    /// worker, and the mean load average as the `load_average` attribute.
    pub fn build_report(&self) -> Node {
        let mut node = Node::new(REPORT_TAG);
        for entry in &self.entries {
            match &entry.slot {
                Slot::Idle(worker) | Slot::Finished {
                    worker,
                    error: None,
                } => {
                    if let Some(fragment) = worker.make_report() {
                        node.push_child(fragment);
                    }
                }
                Slot::Finished {
                    error: Some(err), ..
                }
                | Slot::Lost(err) => {
                    node.push_child(
                        Node::leaf("load_failure", err.to_string())
                            .with_attribute("name", &entry.name),
                    );
                }
                Slot::Running(_) => {
                    warn!(module = %entry.name, "Still running, left out of the report");
                }
                Slot::Empty => {}
            }
        }

        match self.mean_load_metric() {
            Ok(mean) => node.set_attribute("load_average", mean),
            Err(e) => warn!("Load average left out of the report: {}", e),
        }
        node
    }
}

impl Drop for LoadGroup {
    fn drop(&mut self) {
        let running = self
            .entries
            .iter()
            .filter(|e| matches!(e.slot, Slot::Running(_)))
            .count();
        if running > 0 {
            warn!("Load group dropped with {} running thread(s), stopping", running);
            self.stop_all();
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loadavg::tests::ScriptedSource;
    use crate::worker::{JobRecord, LoadContext, LoadModule};
    use tempfile::TempDir;

    /// Reports one job with two arguments. Optionally blocks until stopped and
    /// records whether it ever ran before the test released the group.
    struct Probe {
        released: Arc<AtomicBool>,
        saw_start_before_release: Arc<AtomicBool>,
        hold_until_stop: bool,
        fail: bool,
        panic: bool,
    }

    impl LoadModule for Probe {
        fn run_load(&mut self, ctx: &LoadContext<'_>, jobs: &mut JobRecord) -> Result<(), LoadError> {
            if !self.released.load(Ordering::SeqCst) {
                self.saw_start_before_release.store(true, Ordering::SeqCst);
            }
            if self.panic {
                panic!("probe exploded");
            }
            if self.fail {
                return Err(LoadError::Run("probe failed".to_string()));
            }
            jobs.set(1, vec![ctx.name().to_string(), "--probe".to_string()]);
            while self.hold_until_stop && !ctx.wait_for_stop(Duration::from_millis(10)) {}
            Ok(())
        }
    }

    struct Harness {
        dir: TempDir,
        released: Arc<AtomicBool>,
        early: Vec<Arc<AtomicBool>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                released: Arc::new(AtomicBool::new(false)),
                early: Vec::new(),
            }
        }

        fn worker(&mut self, name: &str, hold: bool, fail: bool, panic: bool) -> LoadThread {
            let early = Arc::new(AtomicBool::new(false));
            self.early.push(Arc::clone(&early));
            let params = LoadParams::default()
                .with_builddir(self.dir.path().join("build"))
                .with_reportdir(self.dir.path());
            LoadThread::new(
                name,
                params,
                Box::new(Probe {
                    released: Arc::clone(&self.released),
                    saw_start_before_release: early,
                    hold_until_stop: hold,
                    fail,
                    panic,
                }),
            )
            .unwrap()
        }

        fn release(&self, group: &LoadGroup) {
            self.released.store(true, Ordering::SeqCst);
            assert!(group.release_all());
        }
    }

    fn scripted_group(readings: Vec<f64>) -> LoadGroup {
        LoadGroup::with_load_average(Arc::new(LoadAverage::new(Box::new(ScriptedSource::new(
            readings,
        )))))
    }

    #[test]
    fn test_release_barrier_holds() {
        let mut h = Harness::new();
        let mut group = scripted_group(vec![1.0]);
        for i in 0..6 {
            group.add(h.worker(&format!("probe{i}"), true, false, false)).unwrap();
        }

        assert_eq!(group.start(), 6);
        assert!(group.wait_ready(Duration::from_secs(10)));
        // Nobody may pass the barrier while we hold it.
        std::thread::sleep(Duration::from_millis(50));
        assert!(group
            .states()
            .iter()
            .all(|(_, s)| *s == LoadState::AwaitingStart));

        h.release(&group);
        group.stop_all();
        let summary = group.join();

        assert!(summary.all_succeeded());
        assert!(h.early.iter().all(|e| !e.load(Ordering::SeqCst)));
        assert!(summary.outcomes.iter().all(|o| o.state == LoadState::Stopped));
    }

    #[test]
    fn test_three_workers_report() {
        let mut h = Harness::new();
        let mut group = scripted_group(vec![0.5, 1.5]);
        for name in ["alpha", "beta", "gamma"] {
            group.add(h.worker(name, false, false, false)).unwrap();
        }

        group.start();
        assert!(group.wait_ready(Duration::from_secs(10)));
        h.release(&group);
        group.sample_load_metric().unwrap();
        group.sample_load_metric().unwrap();
        let summary = group.join();
        assert!(summary.all_succeeded());

        let report = group.build_report();
        assert_eq!(report.name(), "loads");
        assert_eq!(report.children().len(), 3);
        let names: Vec<_> = report
            .children()
            .iter()
            .map(|c| c.attribute("name").unwrap())
            .collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
        for child in report.children() {
            assert_eq!(child.attribute("job_instances"), Some("1"));
            assert_eq!(child.text().unwrap().split(' ').count(), 2);
        }
        let avg: f64 = report.attribute("load_average").unwrap().parse().unwrap();
        assert!((avg - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_report_before_start() {
        let mut h = Harness::new();
        let mut group = scripted_group(vec![2.25]);
        group.add(h.worker("idle", false, false, false)).unwrap();

        let report = group.build_report();
        assert!(report.children().is_empty());
        let avg: f64 = report.attribute("load_average").unwrap().parse().unwrap();
        assert_eq!(avg, 2.25);
        assert_eq!(group.load_average().samples(), 1);
    }

    #[test]
    fn test_stop_before_start_contributes_nothing() {
        let mut h = Harness::new();
        let mut group = scripted_group(vec![1.0]);
        let worker = h.worker("cancelled", false, false, false);
        worker.signals().set_stop();
        group.add(worker).unwrap();
        group.add(h.worker("normal", false, false, false)).unwrap();

        group.start();
        assert!(group.wait_ready(Duration::from_secs(10)));
        h.release(&group);
        let summary = group.join();

        assert!(summary.all_succeeded());
        let report = group.build_report();
        assert_eq!(report.children().len(), 1);
        assert_eq!(report.children()[0].attribute("name"), Some("normal"));
        assert_eq!(
            group.states()[0],
            ("cancelled".to_string(), LoadState::Stopped)
        );
    }

    #[test]
    fn test_stop_all_is_idempotent() {
        let mut h = Harness::new();
        let mut group = scripted_group(vec![1.0]);
        let worker = h.worker("w", true, false, false);
        let signals = worker.signals();
        group.add(worker).unwrap();
        group.start();

        assert!(group.stop_all());
        assert!(!group.stop_all());
        assert!(!group.stop_all());
        assert!(signals.should_stop());
        assert!(group.is_stopped());

        let summary = group.join();
        assert!(summary.all_succeeded());
        assert!(signals.should_stop());
        // Stopped while waiting at the barrier: nothing to report.
        assert!(group.build_report().children().is_empty());
    }

    #[test]
    fn test_release_all_only_once() {
        let h = Harness::new();
        let group = scripted_group(vec![1.0]);
        h.released.store(true, Ordering::SeqCst);
        assert!(group.release_all());
        assert!(!group.release_all());
        assert!(group.is_released());
    }

    #[test]
    fn test_failures_are_surfaced_not_fatal() {
        let mut h = Harness::new();
        let mut group = scripted_group(vec![1.0]);
        group.add(h.worker("ok", false, false, false)).unwrap();
        group.add(h.worker("broken", false, true, false)).unwrap();
        group.add(h.worker("crashy", false, false, true)).unwrap();

        group.start();
        assert!(group.wait_ready(Duration::from_secs(10)));
        h.release(&group);
        let summary = group.join();

        assert!(!summary.all_succeeded());
        let failed: Vec<_> = summary.failures().map(|o| o.name.as_str()).collect();
        assert_eq!(failed, vec!["broken", "crashy"]);
        assert!(summary.outcomes[2]
            .error
            .as_deref()
            .unwrap()
            .contains("probe exploded"));

        let report = group.build_report();
        assert_eq!(report.find_all("command_line").count(), 1);
        assert_eq!(report.find_all("load_failure").count(), 2);
    }

    #[test]
    fn test_join_twice_keeps_outcomes() {
        let mut h = Harness::new();
        let mut group = scripted_group(vec![1.0]);
        group.add(h.worker("w0", false, false, false)).unwrap();
        group.add(h.worker("w1", false, false, false)).unwrap();

        group.start();
        assert!(group.wait_ready(Duration::from_secs(10)));
        h.release(&group);
        group.stop_all();
        let first = group.join();
        let second = group.join();

        assert!(first.all_succeeded());
        assert_eq!(first, second);
        let report = group.build_report();
        assert_eq!(report.find_all("command_line").count(), 2);
        assert_eq!(report.find_all("load_failure").count(), 0);
    }

    #[test]
    fn test_join_before_start_keeps_idle_workers() {
        let mut h = Harness::new();
        let mut group = scripted_group(vec![1.0]);
        group.add(h.worker("w0", false, false, false)).unwrap();

        let summary = group.join();
        assert_eq!(
            summary.outcomes,
            vec![WorkerOutcome {
                name: "w0".to_string(),
                state: LoadState::Created,
                error: None,
            }]
        );
        assert!(group.build_report().children().is_empty());

        // The idle worker is still there to start.
        assert_eq!(group.start(), 1);
        group.stop_all();
        assert!(group.join().all_succeeded());
    }

    /// Build blocks until the test lets it finish.
    struct SlowBuild {
        gate: Arc<AtomicBool>,
    }

    impl LoadModule for SlowBuild {
        fn build(&mut self, _ctx: &LoadContext<'_>) -> Result<(), LoadError> {
            while !self.gate.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(5));
            }
            Ok(())
        }

        fn run_load(&mut self, _ctx: &LoadContext<'_>, jobs: &mut JobRecord) -> Result<(), LoadError> {
            jobs.set(1, vec!["slow".to_string()]);
            Ok(())
        }
    }

    #[test]
    fn test_abandon_unready_workers() {
        let mut h = Harness::new();
        let mut group = scripted_group(vec![1.0]);
        group.add(h.worker("quick", true, false, false)).unwrap();
        let gate = Arc::new(AtomicBool::new(false));
        let params = LoadParams::default()
            .with_builddir(h.dir.path().join("build"))
            .with_reportdir(h.dir.path());
        group
            .add(
                LoadThread::new(
                    "slow",
                    params,
                    Box::new(SlowBuild {
                        gate: Arc::clone(&gate),
                    }),
                )
                .unwrap(),
            )
            .unwrap();

        group.start();
        assert!(!group.wait_ready(Duration::from_millis(200)));
        assert_eq!(group.abandon_unready(), vec!["slow".to_string()]);
        assert!(group.abandon_unready().is_empty());

        h.release(&group);
        gate.store(true, Ordering::SeqCst);
        group.stop_all();
        let summary = group.join();

        let failed: Vec<_> = summary.failures().map(|o| o.name.as_str()).collect();
        assert_eq!(failed, vec!["slow"]);
        assert_eq!(
            summary.outcomes[1].error.as_deref(),
            Some("Not ready before the measurement window started")
        );

        let report = group.build_report();
        assert_eq!(report.find_all("command_line").count(), 1);
        let failure = report.find("load_failure").unwrap();
        assert_eq!(failure.attribute("name"), Some("slow"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut h = Harness::new();
        let mut group = scripted_group(vec![1.0]);
        group.add(h.worker("dup", false, false, false)).unwrap();
        let err = group.add(h.worker("dup", false, false, false)).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateWorker(_)));
    }

    #[test]
    fn test_setup_requires_mapping() {
        let mut group = scripted_group(vec![1.0]);
        let registry = ModuleRegistry::with_builtin();
        let err = group
            .setup(&registry, &Value::from("hackbench"), &LoadParams::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidConfig(_)));
    }

    #[test]
    fn test_setup_from_yaml() {
        let dir = TempDir::new().unwrap();
        let common = LoadParams::default()
            .with_builddir(dir.path().join("build"))
            .with_reportdir(dir.path());
        let section: Value = serde_yaml::from_str(
            r#"
cpuspin: module
spin2:
  module: cpuspin
  numcores: 2
skipped:
  module: cpuspin
  enabled: false
"#,
        )
        .unwrap();

        let mut group = scripted_group(vec![1.0]);
        let added = group
            .setup(&ModuleRegistry::with_builtin(), &section, &common)
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(group.names(), vec!["cpuspin", "spin2"]);
    }

    #[test]
    fn test_setup_unknown_module() {
        let section: Value = serde_yaml::from_str("nosuchload: module").unwrap();
        let mut group = scripted_group(vec![1.0]);
        let err = group
            .setup(&ModuleRegistry::with_builtin(), &section, &LoadParams::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::UnknownModule(_)));
    }

    #[test]
    fn test_empty_group() {
        let mut group = scripted_group(vec![0.0]);
        assert_eq!(group.start(), 0);
        assert!(group.is_ready());
        assert!(group.release_all());
        assert!(group.join().outcomes.is_empty());
        assert_eq!(group.build_report().attribute("load_average"), Some("0"));
    }
}
