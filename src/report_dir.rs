//! Per-run report directory `<workdir>/loadeval-YYYYMMDD-N`.

use anyhow::Context;
use chrono::{DateTime, Local};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPORT_PREFIX: &str = "loadeval";

/// Subdirectory holding per-load log files.
pub const LOGS_DIR: &str = "logs";

/// Create the first free `loadeval-YYYYMMDD-N` directory under `workdir`
/// (N from 1) together with its `logs/` subdirectory.
pub fn create_report_dir(workdir: &Path, started: &DateTime<Local>) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(workdir)
        .with_context(|| format!("Failed to create work directory {}", workdir.display()))?;

    let day = started.format("%Y%m%d");
    let mut n = 1u32;
    let reportdir = loop {
        let candidate = workdir.join(format!("{REPORT_PREFIX}-{day}-{n}"));
        match fs::create_dir(&candidate) {
            Ok(()) => break candidate,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to create report directory {}", candidate.display())
                })
            }
        }
    };

    let logs = reportdir.join(LOGS_DIR);
    fs::create_dir(&logs)
        .with_context(|| format!("Failed to create log directory {}", logs.display()))?;
    info!("Report directory: {}", reportdir.display());
    Ok(reportdir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_sequence_numbers_increment() {
        let dir = TempDir::new().unwrap();
        let started = Local.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap();

        let first = create_report_dir(dir.path(), &started).unwrap();
        let second = create_report_dir(dir.path(), &started).unwrap();
        assert_eq!(first.file_name().unwrap(), "loadeval-20240517-1");
        assert_eq!(second.file_name().unwrap(), "loadeval-20240517-2");
        assert!(first.join("logs").is_dir());
        assert!(second.join("logs").is_dir());
    }

    #[test]
    fn test_gap_is_not_reused_past_existing() {
        let dir = TempDir::new().unwrap();
        let started = Local.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap();
        fs::create_dir(dir.path().join("loadeval-20240517-1")).unwrap();
        fs::create_dir(dir.path().join("loadeval-20240517-3")).unwrap();

        let next = create_report_dir(dir.path(), &started).unwrap();
        assert_eq!(next.file_name().unwrap(), "loadeval-20240517-2");
    }

    #[test]
    fn test_creates_missing_workdir() {
        let dir = TempDir::new().unwrap();
        let workdir = dir.path().join("nested").join("runs");
        let started = Local.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let reportdir = create_report_dir(&workdir, &started).unwrap();
        assert_eq!(reportdir, workdir.join("loadeval-20231231-1"));
    }
}
