//! External program load: N child processes, restarted until stop.

use crate::error::LoadError;
use crate::params::LoadParams;
use crate::worker::{JobRecord, LoadContext, LoadModule};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often children are checked for exit while the load runs.
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Runs `program args...` as `jobs` concurrent children.
///
/// Children that exit are restarted on the next poll. On stop every child is
/// killed and reaped before `run_load` returns.
#[derive(Debug, Clone)]
pub struct CommandLoad {
    program: String,
    args: Vec<String>,
    jobs: usize,
    resolved: Option<PathBuf>,
}

impl CommandLoad {
    pub fn new(program: impl Into<String>, args: Vec<String>, jobs: usize) -> Self {
        Self {
            program: program.into(),
            args,
            jobs,
            resolved: None,
        }
    }

    /// `command` module: keys `program` (required), `args`, `jobs`
    /// (defaults to `numcores`).
    pub fn from_params(params: &LoadParams) -> Result<Box<dyn LoadModule>, LoadError> {
        let program = params.get_str("program")?.ok_or_else(|| {
            LoadError::InvalidConfig("command load requires a 'program' key".to_string())
        })?;
        let args = params.get_string_list("args")?.unwrap_or_default();
        let jobs = match params.get_u64("jobs")? {
            Some(0) => {
                return Err(LoadError::InvalidConfig(
                    "command load 'jobs' must be at least 1".to_string(),
                ))
            }
            Some(n) => n as usize,
            None => params.numcores,
        };
        Ok(Box::new(Self::new(program, args, jobs)))
    }

    /// `hackbench -P -g <2*numcores> -l 1000`, one instance.
    pub fn hackbench(params: &LoadParams) -> Result<Box<dyn LoadModule>, LoadError> {
        Ok(Box::new(Self::hackbench_preset(params)))
    }

    /// `stress-ng --<option> <arg>`, one instance. `option` defaults to
    /// `cpu`, `arg` to `numcores`.
    pub fn stressng(params: &LoadParams) -> Result<Box<dyn LoadModule>, LoadError> {
        Ok(Box::new(Self::stressng_preset(params)?))
    }

    fn hackbench_preset(params: &LoadParams) -> Self {
        let groups = (params.numcores * 2).to_string();
        let args = ["-P", "-g", groups.as_str(), "-l", "1000"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self::new("hackbench", args, 1)
    }

    fn stressng_preset(params: &LoadParams) -> Result<Self, LoadError> {
        let option = params
            .get_str("option")?
            .unwrap_or_else(|| "cpu".to_string());
        let arg = params
            .get_str("arg")?
            .unwrap_or_else(|| params.numcores.to_string());
        Ok(Self::new(
            "stress-ng",
            vec![format!("--{}", option.trim_start_matches('-')), arg],
            1,
        ))
    }

    fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    fn spawn(&self, program: &Path, logs: &Option<(File, File)>) -> std::io::Result<Child> {
        let mut cmd = Command::new(program);
        cmd.args(&self.args).stdin(Stdio::null());
        match logs {
            Some((out, err)) => {
                cmd.stdout(out.try_clone()?).stderr(err.try_clone()?);
            }
            None => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }
        cmd.spawn()
    }
}

impl LoadModule for CommandLoad {
    fn setup(&mut self, ctx: &LoadContext<'_>) -> Result<(), LoadError> {
        let resolved = find_program(&self.program).ok_or_else(|| {
            LoadError::Setup(format!("program '{}' not found", self.program))
        })?;
        debug!(module = %ctx.name(), "Using {}", resolved.display());
        self.resolved = Some(resolved);
        Ok(())
    }

    fn run_load(&mut self, ctx: &LoadContext<'_>, jobs: &mut JobRecord) -> Result<(), LoadError> {
        let program = self
            .resolved
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.program));

        let logs = if ctx.params().logging {
            match (ctx.open_logfile("stdout"), ctx.open_logfile("stderr")) {
                (Ok(out), Ok(err)) => Some((out, err)),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(module = %ctx.name(), "Cannot open log files, discarding output: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let mut children = Vec::with_capacity(self.jobs);
        for _ in 0..self.jobs {
            match self.spawn(&program, &logs) {
                Ok(child) => children.push(child),
                Err(e) => {
                    reap(ctx.name(), &mut children);
                    return Err(LoadError::Run(format!(
                        "failed to start '{}': {}",
                        self.program, e
                    )));
                }
            }
        }
        jobs.set(self.jobs, self.argv());
        info!(module = %ctx.name(), "Running {} instance(s) of {}", self.jobs, self.program);

        while !ctx.wait_for_stop(CHILD_POLL_INTERVAL) {
            for child in children.iter_mut() {
                match child.try_wait() {
                    Ok(None) => {}
                    Ok(Some(status)) => {
                        debug!(module = %ctx.name(), "Child exited with {}, restarting", status);
                        match self.spawn(&program, &logs) {
                            Ok(fresh) => *child = fresh,
                            Err(e) => {
                                warn!(module = %ctx.name(), "Restart failed: {}", e);
                            }
                        }
                    }
                    Err(e) => warn!(module = %ctx.name(), "Cannot poll child: {}", e),
                }
            }
        }

        reap(ctx.name(), &mut children);
        Ok(())
    }
}

fn reap(name: &str, children: &mut Vec<Child>) {
    for mut child in children.drain(..) {
        // Already-exited children make kill fail; waiting still reaps them.
        let _ = child.kill();
        if let Err(e) = child.wait() {
            warn!(module = %name, "Failed to reap child {}: {}", child.id(), e);
        }
    }
}

/// Resolve `program` like a shell would: paths are taken as-is, bare names
/// are looked up on `PATH`.
fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::state::LoadState;
    use crate::worker::LoadThread;
    use tempfile::TempDir;

    fn params(dir: &TempDir) -> LoadParams {
        LoadParams::default()
            .with_builddir(dir.path().join("build"))
            .with_reportdir(dir.path())
            .with_numcores(3)
    }

    #[test]
    fn test_from_params_validation() {
        let dir = TempDir::new().unwrap();
        let p = params(&dir)
            .with_extra("program", "sleep")
            .with_extra("args", "30");
        let worker = LoadThread::new("cmd", p.clone(), CommandLoad::from_params(&p).unwrap()).unwrap();
        assert_eq!(worker.name(), "cmd");

        let missing = CommandLoad::from_params(&params(&dir));
        assert!(matches!(missing, Err(LoadError::InvalidConfig(_))));

        let zero = params(&dir)
            .with_extra("program", "sleep")
            .with_extra("jobs", 0u64);
        assert!(matches!(
            CommandLoad::from_params(&zero),
            Err(LoadError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_presets() {
        let p = LoadParams::default().with_numcores(4);

        let hb = CommandLoad::hackbench_preset(&p);
        assert_eq!(hb.argv().join(" "), "hackbench -P -g 8 -l 1000");
        assert_eq!(hb.jobs, 1);

        let sn = CommandLoad::stressng_preset(&p).unwrap();
        assert_eq!(sn.argv(), vec!["stress-ng", "--cpu", "4"]);

        let vm = p.with_extra("option", "vm").with_extra("arg", 2u64);
        let sn = CommandLoad::stressng_preset(&vm).unwrap();
        assert_eq!(sn.argv(), vec!["stress-ng", "--vm", "2"]);
    }

    #[test]
    fn test_missing_program_fails_setup() {
        let dir = TempDir::new().unwrap();
        let mut worker = LoadThread::new(
            "ghost",
            params(&dir),
            Box::new(CommandLoad::new("no-such-program-for-loadeval", vec![], 1)),
        )
        .unwrap();
        worker.signals().set_start();
        let err = worker.run().unwrap_err();
        assert!(matches!(err, LoadError::Setup(_)));
    }

    #[test]
    fn test_runs_and_stops_children() {
        let dir = TempDir::new().unwrap();
        let mut worker = LoadThread::new(
            "sleeper",
            params(&dir).with_logging(true),
            Box::new(CommandLoad::new("sleep", vec!["30".to_string()], 2)),
        )
        .unwrap();
        let signals = worker.signals();
        let status = worker.status();
        signals.set_start();

        let handle = std::thread::spawn(move || {
            let result = worker.run();
            (worker, result)
        });
        while status.state() != LoadState::Running {
            std::thread::sleep(Duration::from_millis(5));
        }
        std::thread::sleep(Duration::from_millis(100));
        signals.set_stop();
        let (worker, result) = handle.join().unwrap();

        result.unwrap();
        let report = worker.make_report().unwrap();
        assert_eq!(report.attribute("job_instances"), Some("2"));
        assert_eq!(report.text(), Some("sleep 30"));
        assert!(dir.path().join("logs").join("sleeper-stdout.log").is_file());
    }

    #[test]
    fn test_exiting_children_are_restarted_until_stop() {
        let dir = TempDir::new().unwrap();
        let mut worker = LoadThread::new(
            "flappy",
            params(&dir),
            Box::new(CommandLoad::new("true", vec![], 1)),
        )
        .unwrap();
        let signals = worker.signals();
        signals.set_start();

        let handle = std::thread::spawn(move || worker.run());
        std::thread::sleep(Duration::from_millis(600));
        signals.set_stop();
        handle.join().unwrap().unwrap();
    }
}
