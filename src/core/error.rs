//! Error handling for stencil
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`StencilError`]) so callers can match on the
//!    failure kind (a recursion failure is not a configuration failure).
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions
//!    for the CLI.
//!
//! # Error Categories
//!
//! - **Configuration**: [`StencilError::TemplatesDirNotFound`], [`StencilError::ConfigError`].
//!   Fatal and never retried.
//! - **Rendering**: [`StencilError::Template`] (recursion, syntax, missing root),
//!   [`StencilError::EmptyArtifact`], [`StencilError::DocumentRender`]. Scoped to
//!   the root being rendered; they never corrupt the include graph.
//! - **Plumbing**: [`StencilError::Io`], [`StencilError::Toml`], [`StencilError::Json`],
//!   [`StencilError::Other`].
//!
//! Use [`user_friendly_error`] to turn any [`anyhow::Error`] into an
//! [`ErrorContext`] for display.
//!
//! # Examples
//!
//! ```rust,no_run
//! use stencil_cli::core::{StencilError, user_friendly_error};
//! use std::path::PathBuf;
//!
//! let error = StencilError::TemplatesDirNotFound {
//!     path: PathBuf::from("src/main/resources/templates"),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::TemplateId;
use crate::templating::TemplateError;

/// The main error type for stencil operations.
#[derive(Error, Debug)]
pub enum StencilError {
    /// The configured template root directory does not exist.
    #[error("Templates directory not found: {}", path.display())]
    TemplatesDirNotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// The configuration file could not be understood.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Human readable description of the problem
        message: String,
    },

    /// A root was requested that has no backing template file.
    #[error("Template '{name}' not found")]
    TemplateNotFound {
        /// The requested template
        name: TemplateId,
    },

    /// A template that other templates include was requested as a root.
    #[error("Template '{name}' is not a root; render one of its roots instead: {}", format_ids(roots))]
    NotARoot {
        /// The requested template
        name: TemplateId,
        /// Roots that include it
        roots: Vec<TemplateId>,
    },

    /// Compiling or executing a template failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Rendering produced a zero-length artifact.
    #[error("The generated document for '{root}' is empty")]
    EmptyArtifact {
        /// Root whose artifact came out empty
        root: TemplateId,
    },

    /// The document renderer failed to turn HTML into an artifact.
    #[error("Failed to render document for '{root}': {message}")]
    DocumentRender {
        /// Root being rendered
        root: TemplateId,
        /// Error reported by the renderer
        message: String,
    },

    /// Standard I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing failure.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing failure (data model files).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbling up from host-provided collaborators.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StencilError {
    /// Whether the error is a configuration problem that retrying will not fix.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::TemplatesDirNotFound { .. } | Self::ConfigError { .. })
    }

    /// Whether the error was raised by the recursion guard or the depth limit.
    #[must_use]
    pub fn is_recursion(&self) -> bool {
        matches!(self, Self::Template(e) if e.is_recursion())
    }

    /// User-facing message with a suggestion, without consuming the error.
    #[must_use]
    pub fn to_context(&self) -> ErrorContext {
        create_error_context(self)
    }
}

fn format_ids(ids: &[TemplateId]) -> String {
    ids.iter().map(TemplateId::as_str).collect::<Vec<_>>().join(", ")
}

/// Error wrapper carrying a user-facing message, details and a suggestion.
#[derive(Debug)]
pub struct ErrorContext {
    /// The primary error message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from any displayable error.
    #[must_use]
    pub fn new(error: impl fmt::Display) -> Self {
        Self {
            message: error.to_string(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: message in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<ErrorContext>() {
        Ok(context) => return context,
        Err(error) => error,
    };

    if let Some(stencil_error) = error.downcast_ref::<StencilError>() {
        return create_error_context(stencil_error);
    }

    if let Some(template_error) = error.downcast_ref::<TemplateError>() {
        return template_error_context(template_error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        return match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorContext::new(io_error)
                .with_suggestion("Check file ownership and permissions of the templates directory"),
            std::io::ErrorKind::NotFound => ErrorContext::new(io_error)
                .with_suggestion("Check that the file or directory exists and the path is correct"),
            _ => ErrorContext::new(io_error),
        };
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(toml_error)
            .with_suggestion("Check the TOML syntax of stencil.toml")
            .with_details("Keys must be quoted strings, numbers or booleans as documented");
    }

    // Keep the whole context chain visible for generic errors
    let mut message = error.to_string();
    for cause in error.chain().skip(1) {
        message.push_str(&format!("\n  caused by: {cause}"));
    }
    ErrorContext::new(message)
}

fn create_error_context(error: &StencilError) -> ErrorContext {
    match error {
        StencilError::TemplatesDirNotFound { path } => ErrorContext::new(error)
            .with_suggestion(format!(
                "Create {} or point `templates_dir` in stencil.toml at the right directory",
                path.display()
            ))
            .with_details("The include graph can only be built from an existing template root"),
        StencilError::ConfigError { .. } | StencilError::Toml(_) => ErrorContext::new(error)
            .with_suggestion("Check stencil.toml; every key is optional and has a default"),
        StencilError::TemplateNotFound { name } => ErrorContext::new(error).with_suggestion(
            format!("Run 'stencil graph' to list the known roots; '{name}' has no template file"),
        ),
        StencilError::NotARoot { name, .. } => ErrorContext::new(error).with_suggestion(format!(
            "Run 'stencil roots {name}' to see which documents include it"
        )),
        StencilError::Template(template_error) => template_error_context(template_error),
        StencilError::EmptyArtifact { .. } => ErrorContext::new(error)
            .with_details("An empty document is treated as a failure, not as a valid artifact"),
        _ => ErrorContext::new(error),
    }
}

fn template_error_context(error: &TemplateError) -> ErrorContext {
    match error {
        TemplateError::RecursionDetected { name, .. }
        | TemplateError::IncludeDepthExceeded { name, .. } => ErrorContext::new(error)
            .with_suggestion(format!(
                "Run 'stencil check' to list include cycles involving '{name}'"
            ))
            .with_details("A template that includes itself, directly or through other partials, never terminates"),
        TemplateError::Syntax { .. } => ErrorContext::new(error).with_suggestion(
            "Check for unclosed {{#section}} / {{^section}} tags or mismatched closing names",
        ),
        _ => ErrorContext::new(error),
    }
}
