//! Run configuration file.
//!
//! ```yaml
//! run:
//!   duration: 10m
//!   workdir: /var/tmp/loadeval
//!   annotate: "kernel 6.8 rt"
//!   archive: true
//! loads:
//!   hackbench: module
//!   stressng:
//!     option: vm
//!     arg: 2
//!   compile:
//!     module: command
//!     program: make
//!     args: [-C, /usr/src/linux, -j8]
//! ```

pub mod duration;

use anyhow::Context;
use load_modules::LoadParams;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub run: RunSection,
    /// Load module sections keyed by worker name; handed to the load group
    /// as-is.
    pub loads: Value,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run: RunSection::default(),
            loads: Value::Mapping(Mapping::new()),
        }
    }
}

/// Settings of the measurement run itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    /// Length of the measurement window.
    #[serde(deserialize_with = "duration::deserialize")]
    pub duration: Duration,
    /// Parent directory of the per-run report directories.
    pub workdir: PathBuf,
    /// Free-text note stored in the report.
    pub annotate: Option<String>,
    /// Pack the report directory into `<reportdir>.tar.bz2` afterwards.
    pub archive: bool,
    /// Also write `summary.json`.
    pub json: bool,
    /// Upper bound on waiting for every load to finish setup and build.
    #[serde(deserialize_with = "duration::deserialize")]
    pub ready_timeout: Duration,
    /// Load-average sampling period during the window.
    #[serde(deserialize_with = "duration::deserialize")]
    pub sample_interval: Duration,
    /// Cores each load should cover; defaults to every online CPU.
    pub numcores: Option<usize>,
    /// Capture child process output under `<reportdir>/logs`.
    pub logging: bool,
    /// Build area for loads; defaults to `<reportdir>/build`.
    pub builddir: Option<PathBuf>,
    pub srcdir: Option<PathBuf>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(60),
            workdir: PathBuf::from("."),
            annotate: None,
            archive: false,
            json: false,
            ready_timeout: Duration::from_secs(300),
            sample_interval: Duration::from_secs(1),
            numcores: None,
            logging: false,
            builddir: None,
            srcdir: None,
        }
    }
}

impl RunSection {
    /// Parameters shared by every load of a run rooted at `reportdir`.
    pub fn common_params(&self, reportdir: &Path) -> LoadParams {
        let builddir = self
            .builddir
            .clone()
            .unwrap_or_else(|| reportdir.join("build"));
        let mut params = LoadParams::default()
            .with_reportdir(reportdir)
            .with_builddir(builddir)
            .with_numcores(self.numcores.unwrap_or_else(num_cpus::get))
            .with_logging(self.logging);
        if let Some(dir) = &self.srcdir {
            params.srcdir = dir.clone();
        }
        params
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        if config.loads.is_null() {
            config.loads = Value::Mapping(Mapping::new());
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.run.duration.is_zero() {
            anyhow::bail!("run.duration must be greater than zero");
        }
        if self.run.sample_interval.is_zero() {
            anyhow::bail!("run.sample_interval must be greater than zero");
        }
        if self.run.numcores == Some(0) {
            anyhow::bail!("run.numcores must be at least 1");
        }
        if !self.loads.is_mapping() {
            anyhow::bail!("loads must be a mapping of name to module settings");
        }
        Ok(())
    }

    /// Enable `name` with default settings unless the file already lists it.
    pub fn enable_load(&mut self, name: &str) -> anyhow::Result<()> {
        let loads = self
            .loads
            .as_mapping_mut()
            .context("loads must be a mapping of name to module settings")?;
        if !loads.contains_key(name) {
            loads.insert(Value::from(name), Value::from("module"));
        }
        Ok(())
    }

    /// Names of configured loads, in file order.
    pub fn load_names(&self) -> Vec<String> {
        self.loads
            .as_mapping()
            .map(|m| m.keys().filter_map(|k| k.as_str().map(String::from)).collect())
            .unwrap_or_default()
    }
}
