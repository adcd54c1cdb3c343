//! Compressed archive of a finished report directory.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

/// Pack `reportdir` into `<reportdir>.tar.bz2` next to it.
///
/// `tar` runs from the parent directory so the archive holds a single
/// top-level `loadeval-...` entry. The report directory itself is only read.
pub async fn create_archive(reportdir: &Path) -> anyhow::Result<PathBuf> {
    if !reportdir.is_dir() {
        anyhow::bail!("No such directory: {}", reportdir.display());
    }
    let name = reportdir
        .file_name()
        .with_context(|| format!("Report directory has no name: {}", reportdir.display()))?;
    let parent = reportdir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut archive_name = name.to_os_string();
    archive_name.push(".tar.bz2");
    let archive = parent.join(&archive_name);

    let output = Command::new("tar")
        .arg("-cjf")
        .arg(&archive_name)
        .arg(name)
        .current_dir(parent)
        .output()
        .await
        .context("Failed to run tar")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("tar exited with {}: {}", output.status, stderr.trim());
    }

    info!("Archived report to {}", archive.display());
    Ok(archive)
}
