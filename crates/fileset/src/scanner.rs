//! Directory scanning and include/exclude filtering.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::FileSetError;

/// Recursively collects the regular files below `root`.
pub fn scan_directory(root: &Path) -> Result<Vec<PathBuf>, FileSetError> {
    let mut files = Vec::new();
    walk_dir(root, &mut files)?;
    debug!(root = %root.display(), files = files.len(), "scan complete");
    Ok(files)
}

fn walk_dir(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), FileSetError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            walk_dir(&path, files)?;
        } else if metadata.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// Path of `path` relative to `root`, with `/` separators and a leading `/`.
///
/// This is the form used for repository paths and for pattern matching.
pub fn relative_path(root: &Path, path: &Path) -> Result<String, FileSetError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| FileSetError::OutsideRoot {
            path: path.display().to_string(),
            root: root.display().to_string(),
        })?;
    let joined: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(format!("/{}", joined.join("/")))
}

/// Include/exclude glob filter over root-relative paths.
///
/// An empty include list includes everything. Exclusions win over
/// inclusions.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl PathFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, FileSetError> {
        Ok(Self {
            include: build_set(include)?,
            exclude: build_set(exclude)?,
        })
    }

    /// Matches a root-relative path such as `/com/example/foo.jar`.
    ///
    /// Patterns are matched against the path without its leading `/`.
    pub fn matches(&self, relative: &str) -> bool {
        let candidate = relative.strip_prefix('/').unwrap_or(relative);
        let included = self
            .include
            .as_ref()
            .is_none_or(|set| set.is_match(candidate));
        let excluded = self
            .exclude
            .as_ref()
            .is_some_and(|set| set.is_match(candidate));
        included && !excluded
    }
}

fn build_set<S: AsRef<str>>(patterns: &[S]) -> Result<Option<GlobSet>, FileSetError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        builder.add(Glob::new(pattern.strip_prefix('/').unwrap_or(pattern))?);
    }
    Ok(Some(builder.build()?))
}
