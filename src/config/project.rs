//! Project configuration (`stencil.toml`).
//!
//! Every key is optional. Relative paths are resolved against the directory
//! containing the configuration file, or against the working directory when
//! no file exists.
//!
//! ```toml
//! templates_dir = "src/main/resources/templates"
//! suffix = "mustache"
//! scratch_dir = ".stencil/scratch"
//! module_name = "app"
//! mock_vars = false
//! recursion_threshold = 500
//! max_include_depth = 1000
//! extraction = "textual"
//! data_file = "preview.json"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_MAX_INCLUDE_DEPTH, DEFAULT_RECURSION_THRESHOLD,
    DEFAULT_TEMPLATE_SUFFIX, DEFAULT_TEMPLATES_DIR,
};
use crate::core::StencilError;
use crate::resolver::ExtractionMode;

fn default_templates_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TEMPLATES_DIR)
}

fn default_suffix() -> String {
    DEFAULT_TEMPLATE_SUFFIX.to_string()
}

const fn default_recursion_threshold() -> usize {
    DEFAULT_RECURSION_THRESHOLD
}

const fn default_max_include_depth() -> usize {
    DEFAULT_MAX_INCLUDE_DEPTH
}

/// Contents of `stencil.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StencilConfig {
    /// Template root directory.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,

    /// Template file suffix, without the dot.
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Directory receiving rendered artifacts; artifacts stay in memory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    /// Sub-directory of `scratch_dir`, to keep several modules apart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,

    /// Render missing variables as mock values instead of red markers.
    #[serde(default)]
    pub mock_vars: bool,

    /// Consecutive identical loader requests tolerated per compilation.
    #[serde(default = "default_recursion_threshold")]
    pub recursion_threshold: usize,

    /// Maximum include nesting depth.
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,

    /// Include extraction strategy for graph scans.
    #[serde(default)]
    pub extraction: ExtractionMode,

    /// JSON data model rendered into every root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Default for StencilConfig {
    fn default() -> Self {
        Self {
            templates_dir: default_templates_dir(),
            suffix: default_suffix(),
            scratch_dir: None,
            module_name: None,
            mock_vars: false,
            recursion_threshold: default_recursion_threshold(),
            max_include_depth: default_max_include_depth(),
            extraction: ExtractionMode::default(),
            data_file: None,
            base_dir: PathBuf::new(),
        }
    }
}

impl StencilConfig {
    /// Defaults resolved against `base_dir`.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Parse configuration text; relative paths resolve against `base_dir`.
    ///
    /// # Errors
    ///
    /// [`StencilError::ConfigError`] for invalid TOML, unknown keys or invalid values.
    pub fn parse(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self, StencilError> {
        let mut config: Self = toml::from_str(content).map_err(|e| StencilError::ConfigError {
            message: e.to_string(),
        })?;
        config.base_dir = base_dir.into();
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load_from(path: &Path) -> Result<Self, StencilError> {
        let content = std::fs::read_to_string(path).map_err(|e| StencilError::ConfigError {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Self::parse(&content, base_dir).map_err(|e| match e {
            StencilError::ConfigError { message } => StencilError::ConfigError {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })
    }

    /// Find `stencil.toml` in `start` or its ancestors.
    #[must_use]
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start.ancestors().map(|dir| dir.join(CONFIG_FILE_NAME)).find(|path| path.is_file())
    }

    /// Load `explicit` when given, otherwise the discovered file, otherwise defaults for `cwd`.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self, StencilError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        match Self::discover(cwd) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Using configuration file");
                Self::load_from(&path)
            }
            None => {
                tracing::debug!("No {CONFIG_FILE_NAME} found, using defaults");
                Ok(Self::with_base_dir(cwd))
            }
        }
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), StencilError> {
        let invalid = |message: &str| {
            Err(StencilError::ConfigError {
                message: message.to_string(),
            })
        };

        if self.suffix.trim_start_matches('.').is_empty() {
            return invalid("`suffix` must not be empty");
        }
        if self.recursion_threshold == 0 {
            return invalid("`recursion_threshold` must be at least 1");
        }
        if self.max_include_depth == 0 {
            return invalid("`max_include_depth` must be at least 1");
        }
        if self.max_include_depth <= self.recursion_threshold {
            tracing::warn!(
                max_include_depth = self.max_include_depth,
                recursion_threshold = self.recursion_threshold,
                "max_include_depth is not above recursion_threshold; self-includes will be reported as depth errors"
            );
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Directory relative paths are resolved against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Absolute (or base-relative) template root.
    #[must_use]
    pub fn templates_path(&self) -> PathBuf {
        self.resolve(&self.templates_dir)
    }

    /// Scratch directory including the module sub-directory, if configured.
    #[must_use]
    pub fn scratch_path(&self) -> Option<PathBuf> {
        let dir = self.resolve(self.scratch_dir.as_ref()?);
        Some(match &self.module_name {
            Some(module) => dir.join(module),
            None => dir,
        })
    }

    /// Data model file, if configured.
    #[must_use]
    pub fn data_path(&self) -> Option<PathBuf> {
        self.data_file.as_ref().map(|path| self.resolve(path))
    }

    /// Load the JSON data model; `{}` when no data file is configured.
    pub fn load_data(&self) -> Result<Value, StencilError> {
        let Some(path) = self.data_path() else {
            return Ok(Value::Object(serde_json::Map::new()));
        };
        let content = std::fs::read_to_string(&path).map_err(|e| StencilError::ConfigError {
            message: format!("Failed to read data file {}: {e}", path.display()),
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}
