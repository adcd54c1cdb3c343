//! Command-line arguments.

use crate::config::{duration, Config};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "loadeval")]
#[command(about = "Run synthetic system loads over a measurement window and report on them")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the configured loads for one measurement window
    Run(RunArgs),

    /// List the available load modules
    Modules,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// YAML configuration file
    #[arg(short, long, env = "LOADEVAL_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Measurement window, e.g. "90", "300s", "30m", "1h"
    #[arg(short, long)]
    pub duration: Option<String>,

    /// Directory in which the per-run report directory is created
    #[arg(short, long, env = "LOADEVAL_WORKDIR", value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Free-text note stored in the report
    #[arg(short, long)]
    pub annotate: Option<String>,

    /// Pack the report directory into a .tar.bz2 afterwards
    #[arg(long)]
    pub archive: bool,

    /// Enable a load module with default settings (repeatable)
    #[arg(short, long = "load", value_name = "MODULE")]
    pub loads: Vec<String>,

    /// Also write the report as summary.json
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Read the configuration file (if any) and apply command-line overrides.
    pub fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        self.apply(&mut config)?;
        Ok(config)
    }

    /// Overlay flags on `config`. Flags win over file values.
    pub fn apply(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(d) = &self.duration {
            config.run.duration = duration::parse_duration(d)?;
        }
        if let Some(dir) = &self.workdir {
            config.run.workdir = dir.clone();
        }
        if let Some(note) = &self.annotate {
            config.run.annotate = Some(note.clone());
        }
        config.run.archive |= self.archive;
        config.run.json |= self.json;
        for name in &self.loads {
            config.enable_load(name)?;
        }
        config.validate()
    }
}
