//! Template sources: where template text comes from.
//!
//! The engine never touches the file system directly. It asks a
//! [`TemplateSource`] to enumerate files and read their contents, and uses a
//! [`TemplateLayout`] to translate between file paths and [`TemplateId`]s.
//! [`FsTemplateSource`] is the default, `walkdir` based implementation; hosts
//! embedding stencil (editors, build tools) can provide their own, for example
//! to serve unsaved buffers.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::TemplateId;

/// File enumeration and reading capability consumed by the engine.
pub trait TemplateSource: Send + Sync {
    /// The template root directory.
    fn root(&self) -> &Path;

    /// Every file under the root, recursively.
    ///
    /// The order is unspecified; consumers only depend on the resulting sets.
    fn list_files(&self) -> Result<Vec<PathBuf>>;

    /// Read a file as UTF-8 text.
    fn read_text(&self, path: &Path) -> Result<String>;

    /// Whether `path` names an existing regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Whether the root directory exists.
    fn root_exists(&self) -> bool {
        self.root().is_dir()
    }
}

/// [`TemplateSource`] backed by the local file system.
#[derive(Debug, Clone)]
pub struct FsTemplateSource {
    root: PathBuf,
}

impl FsTemplateSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }
}

impl TemplateSource for FsTemplateSource {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.with_context(|| {
                format!("Failed to walk templates directory: {}", self.root.display())
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template: {}", path.display()))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Maps between template files and [`TemplateId`]s for one root and suffix.
#[derive(Debug, Clone)]
pub struct TemplateLayout {
    root: PathBuf,
    suffix: String,
}

impl TemplateLayout {
    /// Create a layout; a leading dot on `suffix` is ignored.
    pub fn new(root: impl Into<PathBuf>, suffix: impl AsRef<str>) -> Self {
        Self {
            root: root.into(),
            suffix: suffix.as_ref().trim_start_matches('.').to_string(),
        }
    }

    /// The template root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The template suffix, without the dot.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Identifier of a file under the root, or `None` for foreign files.
    #[must_use]
    pub fn id_for_path(&self, path: &Path) -> Option<TemplateId> {
        TemplateId::from_path(&self.root, path, &self.suffix).or_else(|| {
            // Relative paths given by a host are interpreted against the root
            if path.is_relative() {
                TemplateId::from_path(&self.root, &self.root.join(path), &self.suffix)
            } else {
                None
            }
        })
    }

    /// File path backing `id`.
    #[must_use]
    pub fn path_for_id(&self, id: &TemplateId) -> PathBuf {
        self.root.join(id.to_relative_path(&self.suffix))
    }

    /// Whether a template file exists for `id`.
    ///
    /// Identifiers pointing above the root never exist.
    pub fn exists(&self, source: &dyn TemplateSource, id: &TemplateId) -> bool {
        !id.is_empty() && !id.escapes_root() && source.is_file(&self.path_for_id(id))
    }

    /// Template files among `files` with their identifiers.
    pub fn templates<'a>(
        &'a self,
        files: &'a [PathBuf],
    ) -> impl Iterator<Item = (TemplateId, &'a Path)> + 'a {
        files.iter().filter_map(|path| self.id_for_path(path).map(|id| (id, path.as_path())))
    }
}
