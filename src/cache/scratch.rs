//! Scratch directory for rendered artifacts.
//!
//! Rendered documents can be written next to the project so external viewers
//! can open them. Files are named after their root with path separators
//! replaced by `_` and the fixed `.mtf.<extension>` suffix:
//! `invoices/summary` becomes `invoices_summary.mtf.html`.
//!
//! The directory is a convenience cache. Any file in it may be deleted at
//! any time and [`ScratchStore::purge`] removes all of them.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{SCRATCH_FILE_INFIX, SCRATCH_SEPARATOR_ESCAPE};
use crate::core::TemplateId;
use crate::utils::atomic_write;

/// Writes and removes scratch artifacts in one directory.
#[derive(Debug, Clone)]
pub struct ScratchStore {
    dir: PathBuf,
    extension: String,
}

impl ScratchStore {
    /// Store files with `extension` (no leading dot) under `dir`.
    pub fn new(dir: impl Into<PathBuf>, extension: impl AsRef<str>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.as_ref().trim_start_matches('.').to_string(),
        }
    }

    /// The scratch directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name used for `root`.
    ///
    /// Distinct roots such as `a/b` and `a_b` share a file name.
    #[must_use]
    pub fn file_name(&self, root: &TemplateId) -> String {
        let sanitized = root.as_str().replace('/', &SCRATCH_SEPARATOR_ESCAPE.to_string());
        format!("{sanitized}{SCRATCH_FILE_INFIX}{}", self.extension)
    }

    /// Full path used for `root`.
    #[must_use]
    pub fn path_for(&self, root: &TemplateId) -> PathBuf {
        self.dir.join(self.file_name(root))
    }

    /// Write the artifact of `root`, returning its path.
    pub fn write(&self, root: &TemplateId, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(root);
        atomic_write(&path, bytes)
            .with_context(|| format!("Failed to write scratch artifact for '{root}'"))?;
        tracing::debug!(root = %root, path = %path.display(), "Wrote scratch artifact");
        Ok(path)
    }

    /// Remove the artifact of `root`; returns whether a file was deleted.
    pub fn remove(&self, root: &TemplateId) -> Result<bool> {
        let path = self.path_for(root);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove scratch artifact: {}", path.display())),
        }
    }

    /// Whether `path` looks like a scratch artifact.
    #[must_use]
    pub fn is_scratch_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains(SCRATCH_FILE_INFIX))
    }

    /// Delete every scratch artifact in the directory; returns the count.
    ///
    /// A missing directory counts as already clean. Other files are left alone.
    pub fn purge(&self) -> Result<usize> {
        if !self.dir.is_dir() {
            return Ok(0);
        }

        let mut removed = 0;
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read scratch directory: {}", self.dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && Self::is_scratch_file(&path) {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                removed += 1;
            }
        }

        tracing::info!(removed, dir = %self.dir.display(), "Purged scratch artifacts");
        Ok(removed)
    }
}
