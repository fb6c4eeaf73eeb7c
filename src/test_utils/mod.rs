//! Test utilities shared by unit and integration tests.
//!
//! Available under `cfg(test)` and with the `test-utils` feature.
//!
//! - [`init_test_logging`] - opt-in tracing output for tests
//! - [`TemplateTree`] - a temporary template directory with an engine on top

use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::constants::DEFAULT_TEMPLATE_SUFFIX;
use crate::engine::{TemplateEngine, TemplateEngineBuilder};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; without either no
/// subscriber is installed.
///
/// ```bash
/// RUST_LOG=stencil_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// A temporary template root.
///
/// ```rust,no_run
/// use stencil_cli::test_utils::TemplateTree;
///
/// let tree = TemplateTree::new()
///     .with("invoice", "{{> mail/footer}}")
///     .with("mail/footer", "Regards");
/// let engine = tree.engine();
/// engine.rebuild().unwrap();
/// ```
pub struct TemplateTree {
    temp: TempDir,
    root: PathBuf,
}

impl TemplateTree {
    /// Create an empty tree with a `templates/` root inside a fresh temp dir.
    ///
    /// # Panics
    ///
    /// When the temp directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let root = temp.path().join("templates");
        std::fs::create_dir_all(&root).expect("create templates dir");
        Self {
            temp,
            root,
        }
    }

    /// Builder-style [`TemplateTree::write`].
    #[must_use]
    pub fn with(self, name: &str, content: &str) -> Self {
        self.write(name, content);
        self
    }

    /// Write template `name` (without suffix), creating directories.
    ///
    /// # Panics
    ///
    /// On I/O errors.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create template dir");
        }
        std::fs::write(&path, content).expect("write template");
        path
    }

    /// Delete template `name`.
    ///
    /// # Panics
    ///
    /// When the file does not exist.
    pub fn remove(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::remove_file(&path).expect("remove template");
        path
    }

    /// Rename template `from` to `to`, returning both paths.
    ///
    /// # Panics
    ///
    /// On I/O errors.
    pub fn rename(&self, from: &str, to: &str) -> (PathBuf, PathBuf) {
        let (from, to) = (self.path(from), self.path(to));
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).expect("create template dir");
        }
        std::fs::rename(&from, &to).expect("rename template");
        (from, to)
    }

    /// File path of template `name`.
    #[must_use]
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{DEFAULT_TEMPLATE_SUFFIX}"))
    }

    /// The template root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The temp directory containing the root, for config files and scratch dirs.
    #[must_use]
    pub fn base(&self) -> &Path {
        self.temp.path()
    }

    /// Engine builder over this tree.
    #[must_use]
    pub fn builder(&self) -> TemplateEngineBuilder {
        TemplateEngine::builder(&self.root)
    }

    /// Engine over this tree with default settings (not yet scanned).
    ///
    /// # Panics
    ///
    /// When the engine cannot be built.
    #[must_use]
    pub fn engine(&self) -> TemplateEngine {
        self.builder().build().expect("build engine")
    }
}

impl Default for TemplateTree {
    fn default() -> Self {
        Self::new()
    }
}
