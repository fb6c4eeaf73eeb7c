//! Normalized template identifiers.
//!
//! A [`TemplateId`] is the slash-separated path of a template relative to the
//! template root, without the file suffix. Every place that turns a string
//! into an identifier (file scanning, include extraction, loader requests,
//! CLI arguments) goes through [`TemplateId::new`] so that `header`,
//! `/header` and `partials//header` style spellings compare equal.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::path::{Component, Path};

/// Normalized, slash-separated template identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TemplateId(String);

impl TemplateId {
    /// Normalize `raw` into an identifier.
    ///
    /// Backslashes count as separators, repeated separators collapse, leading
    /// and trailing separators and `.` segments are dropped, and surrounding
    /// whitespace is trimmed. A `..` segment cancels the segment before it;
    /// the ones that climb above the root are kept at the front, see
    /// [`escapes_root`](Self::escapes_root).
    ///
    /// ```
    /// use stencil_cli::core::TemplateId;
    ///
    /// assert_eq!(TemplateId::new("/partials//header"), TemplateId::new("partials/header"));
    /// assert_eq!(TemplateId::new(" footer ").as_str(), "footer");
    /// assert_eq!(TemplateId::new("mail/../footer"), TemplateId::new("footer"));
    /// assert!(TemplateId::new("../secret").escapes_root());
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.as_ref().trim().split(['/', '\\']).map(str::trim) {
            match segment {
                "" | "." => {}
                ".." if segments.last().is_some_and(|last| *last != "..") => {
                    segments.pop();
                }
                _ => segments.push(segment),
            }
        }
        Self(segments.join("/"))
    }

    /// Whether the identifier points above the template root (`../x`).
    ///
    /// Such identifiers never have a backing template.
    #[must_use]
    pub fn escapes_root(&self) -> bool {
        self.0 == ".." || self.0.starts_with("../")
    }

    /// Build the identifier of `path`, a file under `root` ending in `.{suffix}`.
    ///
    /// Returns `None` when the path is outside the root or has another suffix.
    pub fn from_path(root: &Path, path: &Path, suffix: &str) -> Option<Self> {
        let relative = path.strip_prefix(root).ok()?;
        if relative.extension()?.to_str()? != suffix {
            return None;
        }

        let mut segments = Vec::new();
        for component in relative.with_extension("").components() {
            match component {
                Component::Normal(part) => segments.push(part.to_str()?.to_string()),
                Component::CurDir => {}
                _ => return None,
            }
        }

        let id = Self::new(segments.join("/"));
        (!id.is_empty()).then_some(id)
    }

    /// Relative file path of this identifier under a template root.
    #[must_use]
    pub fn to_relative_path(&self, suffix: &str) -> String {
        format!("{}.{suffix}", self.0)
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether normalization left nothing behind (e.g. `{{> }}`).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last path segment, used for compact display.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for TemplateId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl AsRef<str> for TemplateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TemplateId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for TemplateId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TemplateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}
