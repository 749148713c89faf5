/// Path normalization utilities
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Normalize a workspace path to its canonical form.
///
/// Orchestrators are keyed by this value so that `/w`, `/w/` and symlinked
/// spellings of the same directory resolve to one instance.
pub fn normalize_path(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);
    let canonical = std::fs::canonicalize(&path_buf)
        .with_context(|| format!("Failed to canonicalize path: {}", path))?;
    Ok(canonical.to_string_lossy().to_string())
}
