//! Member file discovery.
//!
//! Discovery only produces paths; turning them into sources is the pool's job.

use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{TableError, TableResult};

/// Which files under a root become pool members.
///
/// - `extension`: file-name suffix (e.g. `.csv`). Matched case-sensitively, as a plain suffix.
/// - `pattern`: regex searched in the file name (not the full path).
///
/// With neither set, every regular file under the root is a member.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryFilter {
    pub pattern: Option<Regex>,
    pub extension: Option<String>,
}

impl DiscoveryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with [`TableError::InvalidConfig`] if `pattern` is not a valid regex.
    pub fn with_pattern(mut self, pattern: &str) -> TableResult<Self> {
        let re = Regex::new(pattern).map_err(|e| TableError::invalid_config("pattern", e.to_string()))?;
        self.pattern = Some(re);
        Ok(self)
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Whether a file name passes the filter.
    pub fn matches(&self, file_name: &str) -> bool {
        if let Some(ext) = &self.extension {
            if !file_name.ends_with(ext.as_str()) {
                return false;
            }
        }
        match &self.pattern {
            Some(re) => re.is_match(file_name),
            None => true,
        }
    }
}

/// Recursively list regular files under `root` that pass `filter`.
///
/// Entries are visited depth-first with each directory's entries sorted by file name, so the
/// result order is stable across runs. Unreadable entries (including a missing root) are logged
/// and skipped; an empty result is not an error.
pub fn discover_paths(root: impl AsRef<Path>, filter: &DiscoveryFilter) -> Vec<PathBuf> {
    let root = root.as_ref();
    let mut out = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("skipping unreadable entry under {}: {e}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            log::debug!("skipping non UTF-8 file name {}", entry.path().display());
            continue;
        };
        if filter.matches(name) {
            out.push(entry.into_path());
        }
    }

    log::debug!("discovered {} files under {}", out.len(), root.display());
    out
}
