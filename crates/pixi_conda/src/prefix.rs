//! Inspection of conda prefixes on disk.
//!
//! A directory is considered a live conda environment when it contains the
//! `conda-meta/history` marker file. Everything else that lives in
//! `conda-meta` (package records, pinned specs, ...) means the environment is
//! actively used.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use miette::Diagnostic;
use pixi_consts::consts;
use thiserror::Error;

/// Structural facts about the metadata directory of a prefix.
///
/// This is always computed from the live filesystem and never persisted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MarkerState {
    /// The `conda-meta/history` file exists.
    pub has_marker: bool,

    /// `conda-meta` contains entries other than the marker file.
    pub has_other_files: bool,
}

impl MarkerState {
    /// Returns true if the prefix looks like a live conda environment.
    pub fn is_environment(&self) -> bool {
        self.has_marker
    }

    /// Returns true if the prefix cannot be unregistered because its
    /// metadata directory holds more than just the marker.
    pub fn is_pinned(&self) -> bool {
        self.has_other_files
    }
}

/// Inspects the metadata directory of the given prefix.
///
/// A prefix that does not exist, or that has no metadata directory, is
/// reported as having neither the marker nor any other files. This function
/// never modifies the filesystem.
pub fn inspect(prefix: &Path) -> MarkerState {
    let meta_dir = prefix.join(consts::CONDA_META_DIR);
    let has_marker = meta_dir.join(consts::CONDA_HISTORY_FILE).exists();

    let entries = match fs_err::read_dir(&meta_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return MarkerState {
                has_marker,
                has_other_files: false,
            };
        }
        Err(e) => {
            // An unreadable metadata directory is treated as in use.
            tracing::warn!("unable to inspect '{}': {e}", meta_dir.display());
            return MarkerState {
                has_marker,
                has_other_files: true,
            };
        }
    };

    let has_other_files = entries
        .filter_map(Result::ok)
        .any(|entry| entry.file_name() != consts::CONDA_HISTORY_FILE);

    MarkerState {
        has_marker,
        has_other_files,
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum NormalizePrefixError {
    #[error("cannot expand '{}' because the home directory could not be determined", .0.display())]
    HomeNotFound(PathBuf),

    #[error("failed to determine the current directory")]
    CurrentDir(#[source] std::io::Error),
}

/// Turns a user supplied path into the canonical form stored in the
/// registry.
///
/// A leading `~` is replaced by the home directory, relative paths are
/// resolved against the current directory and `.`/`..` components are
/// removed lexically. The path does not have to exist, symlinks are left
/// alone.
pub fn normalize_prefix(path: &Path) -> Result<PathBuf, NormalizePrefixError> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .ok_or_else(|| NormalizePrefixError::HomeNotFound(path.to_path_buf()))?
            .join(rest),
        Err(_) => path.to_path_buf(),
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map_err(NormalizePrefixError::CurrentDir)?
            .join(expanded)
    };

    Ok(normalize_components(&absolute))
}

fn normalize_components(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
