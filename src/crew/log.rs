//! Seed input and the timestamped output artifact.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Read a seed file and return its trimmed contents.
pub fn read_seed_file(path: &Path) -> Result<String> {
    if !path.exists() {
        anyhow::bail!("Seed file '{}' not found", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
    Ok(content.trim().to_string())
}

/// Write `output` to `{log_dir}/output_log_{YYYYmmdd_HHMMSS}.txt`, creating
/// `log_dir` if needed. Returns the written path.
pub fn save_output_to_log(output: &str, log_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = log_dir.join(format!("output_log_{}.txt", timestamp));
    std::fs::write(&path, output)
        .with_context(|| format!("Failed to write log file: {}", path.display()))?;

    tracing::info!(path = %path.display(), bytes = output.len(), "crew output saved");
    Ok(path)
}
