/// Eligible-file enumeration for a workspace scan
use crate::config::IndexConfig;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// A file selected by the scan, before reading or hashing
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub relative_path: String,
}

/// Enumerate files eligible for indexing.
///
/// Applies gitignore-style filters, the configured directory ignore-list
/// and extension allow-list, and drops files over `max_file_size` by
/// metadata before any content is read. Output is sorted by relative path.
pub fn scan_workspace(root: &Path, config: &IndexConfig) -> Result<Vec<ScannedFile>> {
    if !root.exists() {
        anyhow::bail!("Workspace directory does not exist: {:?}", root);
    }
    if !root.is_dir() {
        anyhow::bail!("Workspace path is not a directory: {:?}", root);
    }

    let ignored_dirs = config.ignored_dirs.clone();
    let walker = WalkBuilder::new(root)
        .standard_filters(true)
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .git_global(true)
        .require_git(false)
        .filter_entry(move |entry| {
            if entry.file_type().is_some_and(|t| t.is_dir()) {
                let name = entry.file_name().to_string_lossy();
                return !ignored_dirs.contains(name.as_ref());
            }
            true
        })
        .build();

    let mut files = Vec::new();

    for entry in walker {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if path.is_dir() {
            continue;
        }

        if path.components().any(|c| c.as_os_str() == ".git") {
            continue;
        }

        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !config.included_exts.contains(&extension.to_lowercase()) {
            continue;
        }

        if let Ok(metadata) = std::fs::metadata(path)
            && metadata.len() > config.max_file_size as u64
        {
            tracing::debug!("Skipping large file: {:?}", path);
            continue;
        }

        let relative_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();

        files.push(ScannedFile {
            path: path.to_path_buf(),
            relative_path,
        });
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    tracing::info!("Found {} eligible files in {:?}", files.len(), root);
    Ok(files)
}

/// Heuristic text check for content that decoded as UTF-8: if more than
/// 30% of bytes are non-printable control characters, treat it as binary.
pub(crate) fn is_probably_text(content: &str) -> bool {
    if content.is_empty() {
        return true;
    }

    let non_printable = content
        .bytes()
        .filter(|&b| b < 0x20 && b != b'\n' && b != b'\r' && b != b'\t')
        .count();

    (non_printable as f64 / content.len() as f64) < 0.3
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_filters_extensions_and_dirs() {
        let dir = TempDir::new().unwrap();
        write(&dir, "src/main.rs", "fn main() {}");
        write(&dir, "src/util.py", "def f(): pass");
        write(&dir, "image.bin", "binary");
        write(&dir, "node_modules/pkg/index.js", "module.exports = 1;");
        write(&dir, "target/debug/out.rs", "fn generated() {}");

        let files = scan_workspace(dir.path(), &IndexConfig::default()).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();

        assert_eq!(paths, vec!["src/main.rs", "src/util.py"]);
    }

    #[test]
    fn test_scan_size_guard() {
        let dir = TempDir::new().unwrap();
        write(&dir, "small.rs", "fn ok() {}");
        write(&dir, "huge.rs", &"x".repeat(200));

        let mut config = IndexConfig::default();
        config.max_file_size = 100;

        let files = scan_workspace(dir.path(), &config).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["small.rs"]);
    }

    #[test]
    fn test_scan_output_is_sorted() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.rs", "fn b() {}");
        write(&dir, "a.rs", "fn a() {}");
        write(&dir, "src/c.rs", "fn c() {}");

        let files = scan_workspace(dir.path(), &IndexConfig::default()).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs", "src/c.rs"]);
    }

    #[test]
    fn test_scan_missing_root_errors() {
        let result = scan_workspace(Path::new("/nonexistent/ws"), &IndexConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_is_probably_text() {
        assert!(is_probably_text("fn main() {}\n"));
        assert!(is_probably_text(""));
        assert!(!is_probably_text("\u{0}\u{1}\u{2}\u{3}ab"));
    }
}
