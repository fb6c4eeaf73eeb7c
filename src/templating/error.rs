//! Errors raised while loading, compiling and executing templates.

use thiserror::Error;

use crate::core::TemplateId;

/// Failure of a single compilation or execution pass.
///
/// These errors are scoped to the root being compiled; they never affect the
/// include graph or the cached artifacts of other roots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The same template was requested from the loader too many times in a row.
    #[error(
        "Recursion detected: template '{name}' was requested {count} times in a row; it probably includes itself"
    )]
    RecursionDetected {
        /// Template requested repeatedly
        name: TemplateId,
        /// Consecutive request count at the time of the abort
        count: usize,
    },

    /// Includes nested deeper than the configured limit (a cycle through several templates).
    #[error("Include depth limit of {limit} exceeded while loading '{name}'; check for include cycles")]
    IncludeDepthExceeded {
        /// Template whose load would exceed the limit
        name: TemplateId,
        /// Configured maximum depth
        limit: usize,
    },

    /// The template text could not be parsed.
    #[error("Syntax error in '{template}' at line {line}: {message}")]
    Syntax {
        /// Template containing the error
        template: TemplateId,
        /// 1-based source line
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// The root template has no backing file.
    #[error("Template '{name}' not found")]
    NotFound {
        /// The requested template
        name: TemplateId,
    },

    /// The loader could not read a template.
    #[error("Failed to load template '{name}': {message}")]
    Load {
        /// Template being loaded
        name: TemplateId,
        /// Underlying error, flattened to text
        message: String,
    },
}

impl TemplateError {
    /// Whether this is a recursion-detected failure (guard or depth limit).
    #[must_use]
    pub fn is_recursion(&self) -> bool {
        matches!(self, Self::RecursionDetected { .. } | Self::IncludeDepthExceeded { .. })
    }
}
