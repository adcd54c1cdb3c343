//! Error types for load modules and groups.

use thiserror::Error;

/// Errors that can occur while configuring or running load modules.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Worker names must be non-empty.
    #[error("Load module name must not be empty")]
    InvalidName,

    /// Malformed configuration section or parameter.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// No factory registered under this module name.
    #[error("Unknown load module: {0}")]
    UnknownModule(String),

    /// Two workers in one group share a name.
    #[error("Duplicate load module name: {0}")]
    DuplicateWorker(String),

    /// One-time preparation failed.
    #[error("Setup failed: {0}")]
    Setup(String),

    /// One-time build failed.
    #[error("Build failed: {0}")]
    Build(String),

    /// Load generation failed.
    #[error("Run failed: {0}")]
    Run(String),

    /// Setup or build did not finish before the measurement window.
    #[error("Not ready before the measurement window started")]
    NotReady,

    /// The worker thread panicked.
    #[error("Load thread panicked: {0}")]
    Panicked(String),

    /// Could not read the load average.
    #[error("Load average unavailable: {0}")]
    LoadAverage(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for LoadError {
    fn from(err: serde_yaml::Error) -> Self {
        LoadError::InvalidConfig(err.to_string())
    }
}
