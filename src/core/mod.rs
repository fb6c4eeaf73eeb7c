//! Core types shared by every stencil module.
//!
//! - [`TemplateId`] - normalized template identifiers
//! - [`StencilError`] - the crate-level error enum
//! - [`ErrorContext`] and [`user_friendly_error`] - CLI-facing error display
//!
//! # Examples
//!
//! ```rust
//! use stencil_cli::core::{StencilError, TemplateId, user_friendly_error};
//!
//! let error = StencilError::TemplateNotFound { name: TemplateId::new("invoice") };
//! let friendly = user_friendly_error(error.into());
//! assert!(friendly.suggestion.is_some());
//! ```

pub mod error;
pub mod template_id;

pub use error::{ErrorContext, StencilError, user_friendly_error};
pub use template_id::TemplateId;

/// Result alias for operations that fail with [`StencilError`].
pub type Result<T, E = StencilError> = std::result::Result<T, E>;
