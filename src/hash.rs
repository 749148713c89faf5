/// Content hashing and change classification for incremental indexing
///
/// A file's hash is recomputed on every pass; chunks regenerate only when
/// the hash changed or no prior hash exists. Deletions are the set
/// difference between previously-known paths and the current listing.
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Compute the SHA-256 hex digest of file content
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Change state of one file relative to the previous successful index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// No prior hash recorded
    New,
    /// Prior hash differs from the current one
    Changed,
    /// Prior hash matches; the file can be skipped
    Unchanged,
}

/// Classify a file given the prior hash map and its freshly computed hash
pub fn classify(prior: &HashMap<String, String>, relative_path: &str, hash: &str) -> FileState {
    match prior.get(relative_path) {
        None => FileState::New,
        Some(old) if old != hash => FileState::Changed,
        Some(_) => FileState::Unchanged,
    }
}

/// Paths present in the prior index but absent from the current listing.
///
/// Each returned path is reported deleted exactly once per run by the
/// caller; ordering is stable for deterministic output.
pub fn deleted_paths<'a, I>(prior: &HashMap<String, String>, current: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let current: std::collections::HashSet<&str> = current.into_iter().collect();
    let mut deleted: Vec<String> = prior
        .keys()
        .filter(|path| !current.contains(path.as_str()))
        .cloned()
        .collect();
    deleted.sort();
    deleted
}
