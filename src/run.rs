//! One measurement run from report directory to summary file.
//!
//! The coordinator sets up every configured load, waits until all of them
//! finished preparing, releases them together and samples the load average
//! until the window ends (or the run is interrupted). It then stops and joins
//! the loads and writes the report.

use crate::archive;
use crate::config::Config;
use crate::report_dir;
use crate::run_info;
use crate::sysinfo_report::SystemInfo;
use anyhow::Context;
use chrono::{DateTime, Local};
use load_modules::{JoinSummary, LoadGroup, LoadState, ModuleRegistry};
use report_doc::{DocError, JsonTransform, Node, ReportBuilder};
use std::collections::BTreeSet;
use std::fs::File;
use std::future::Future;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Root element of the run report.
pub const REPORT_ROOT: &str = "loadeval";
pub const SUMMARY_XML: &str = "summary.xml";
pub const SUMMARY_JSON: &str = "summary.json";

const READY_POLL: Duration = Duration::from_millis(100);
const PROGRESS_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("No measurement runs have been attempted")]
    NoMeasurement,

    #[error("Report document error: {0}")]
    Document(#[from] DocError),
}

/// Everything the run report is assembled from.
#[derive(Debug)]
pub struct ReportInputs<'a> {
    /// Wall-clock start of the run.
    pub started: DateTime<Local>,
    /// Length of the measurement window; `None` if loads were never released.
    pub measured: Option<Duration>,
    pub annotate: Option<&'a str>,
    pub system: Node,
    pub loads: Node,
}

/// Build the closed run report document.
pub fn assemble_report(inputs: ReportInputs<'_>) -> Result<ReportBuilder, RunError> {
    let elapsed = inputs.measured.ok_or(RunError::NoMeasurement)?;

    let mut builder = ReportBuilder::new();
    builder.new_document(REPORT_ROOT, [("version", env!("CARGO_PKG_VERSION"))])?;
    run_info::write_run_info(&mut builder, &inputs.started, elapsed, inputs.annotate)?;
    builder.append_subtree(inputs.system)?;
    builder.append_subtree(inputs.loads)?;
    builder.close()?;
    Ok(builder)
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub reportdir: PathBuf,
    pub report: PathBuf,
    pub archive: Option<PathBuf>,
    pub summary: JoinSummary,
    pub elapsed: Duration,
    pub load_average: Option<f64>,
    /// The window was cut short by `shutdown`.
    pub interrupted: bool,
    /// Loads that were still preparing when `ready_timeout` ran out. They
    /// are stopped, left out of the window and reported as failed.
    pub not_ready: Vec<String>,
}

enum Readiness {
    Ready,
    TimedOut,
    Interrupted,
}

/// Execute one run.
///
/// `shutdown` ends the run early when it completes (Ctrl-C in the binary).
/// Loads that fail are reported in the summary and the report; they do not
/// abort the run.
pub async fn run<F>(
    config: &Config,
    registry: &ModuleRegistry,
    shutdown: F,
) -> anyhow::Result<RunOutcome>
where
    F: Future<Output = ()>,
{
    let started = Local::now();
    let reportdir = report_dir::create_report_dir(&config.run.workdir, &started)?;
    let common = config.run.common_params(&reportdir);

    let mut group = LoadGroup::new();
    group
        .setup(registry, &config.loads, &common)
        .context("Failed to set up load modules")?;
    if group.is_empty() {
        warn!("No load modules configured, measuring an idle system");
    }
    let system = SystemInfo::collect();

    tokio::pin!(shutdown);
    group.start();

    let readiness = {
        let deadline = Instant::now() + config.run.ready_timeout;
        loop {
            if group.is_ready() {
                break Readiness::Ready;
            }
            if Instant::now() >= deadline {
                break Readiness::TimedOut;
            }
            tokio::select! {
                _ = tokio::time::sleep(READY_POLL) => {}
                _ = &mut shutdown => break Readiness::Interrupted,
            }
        }
    };

    let mut measured = None;
    let mut interrupted = false;
    let mut not_ready = Vec::new();
    if let Readiness::TimedOut = readiness {
        not_ready = group.abandon_unready();
        warn!(
            "Loads not ready after {:?}, measuring without them: {}",
            config.run.ready_timeout,
            not_ready.join(", ")
        );
    }
    match readiness {
        Readiness::Ready | Readiness::TimedOut => {
            group.release_all();
            let window_start = Instant::now();
            info!(
                "Measurement window started ({}s, {} load(s))",
                config.run.duration.as_secs(),
                group.len() - not_ready.len()
            );
            interrupted = measure(&group, config, shutdown.as_mut()).await;
            measured = Some(window_start.elapsed());
        }
        Readiness::Interrupted => {
            warn!("Interrupted before the measurement window started");
            interrupted = true;
        }
    }

    group.stop_all();
    let (group, summary) = join_group(group).await?;

    let loads = group.build_report();
    let load_average = loads
        .attribute("load_average")
        .and_then(|v| v.parse::<f64>().ok());
    let elapsed = measured.unwrap_or_default();
    let builder = assemble_report(ReportInputs {
        started,
        measured,
        annotate: config.run.annotate.as_deref(),
        system: system.to_node(),
        loads,
    })?;
    let report = write_report(&builder, &reportdir, config.run.json)?;

    let archive = if config.run.archive {
        match archive::create_archive(&reportdir).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(
                    "Failed to archive report ({:#}), results are in {}",
                    e,
                    reportdir.display()
                );
                None
            }
        }
    } else {
        None
    };

    Ok(RunOutcome {
        reportdir,
        report,
        archive,
        summary,
        elapsed,
        load_average,
        interrupted,
        not_ready,
    })
}

/// Sample the load average until the window ends. Returns whether
/// `shutdown` cut it short.
async fn measure<F>(
    group: &LoadGroup,
    config: &Config,
    mut shutdown: std::pin::Pin<&mut F>,
) -> bool
where
    F: Future<Output = ()>,
{
    let window_start = Instant::now();
    let window = tokio::time::sleep(config.run.duration);
    tokio::pin!(window);
    let mut ticker = tokio::time::interval(config.run.sample_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut next_progress = window_start + PROGRESS_INTERVAL;
    let mut ended_early = BTreeSet::new();

    loop {
        tokio::select! {
            _ = &mut window => return false,
            _ = &mut shutdown => {
                warn!("Interrupted, stopping loads early");
                return true;
            }
            _ = ticker.tick() => {
                match group.sample_load_metric() {
                    Ok(load) => debug!("Load average sample: {:.2}", load),
                    Err(e) => warn!("Load average sample failed: {}", e),
                }

                for (name, state) in group.states() {
                    if state == LoadState::Stopped && ended_early.insert(name.clone()) {
                        warn!(module = %name, "Load ended before the measurement window");
                    }
                }

                if Instant::now() >= next_progress {
                    let elapsed = window_start.elapsed();
                    info!(
                        "Measuring: {}s elapsed, {}s remaining",
                        elapsed.as_secs(),
                        config.run.duration.saturating_sub(elapsed).as_secs()
                    );
                    next_progress += PROGRESS_INTERVAL;
                }
            }
        }
    }
}

/// Join worker threads off the async runtime.
async fn join_group(mut group: LoadGroup) -> anyhow::Result<(LoadGroup, JoinSummary)> {
    tokio::task::spawn_blocking(move || {
        let summary = group.join();
        (group, summary)
    })
    .await
    .context("Load join task failed")
}

/// Write `summary.xml` (and `summary.json` when asked) into `reportdir`.
fn write_report(builder: &ReportBuilder, reportdir: &Path, json: bool) -> anyhow::Result<PathBuf> {
    let path = reportdir.join(SUMMARY_XML);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    builder
        .serialize(&mut BufWriter::new(file), None)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Report written to {}", path.display());

    if json {
        let json_path = reportdir.join(SUMMARY_JSON);
        let file = File::create(&json_path)
            .with_context(|| format!("Failed to create {}", json_path.display()))?;
        builder
            .serialize(&mut BufWriter::new(file), Some(&JsonTransform { pretty: true }))
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
    }
    Ok(path)
}
