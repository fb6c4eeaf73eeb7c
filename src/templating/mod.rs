//! Template compilation for stencil.
//!
//! This module owns everything between template text and rendered HTML:
//!
//! - [`TemplateLoader`] implementations that supply template text
//!   ([`SourceLoader`], [`MemoryLoader`], the probing [`RecordingLoader`])
//! - the [`RecursionGuard`] and the [`GuardedLoader`] applying it
//! - the [`TemplateCompiler`] / [`CompiledTemplate`] seam and the built-in
//!   [`MustacheCompiler`]
//! - [`RawSegment`], the backend-neutral structure consumed by the outline extractor
//!
//! # Supported Mustache subset
//!
//! | Tag                    | Meaning                                   |
//! |------------------------|-------------------------------------------|
//! | `{{name}}`             | HTML-escaped variable                     |
//! | `{{{name}}}`, `{{&name}}` | unescaped variable                     |
//! | `{{#name}}…{{/name}}`  | section (iterates arrays)                 |
//! | `{{^name}}…{{/name}}`  | inverted section                          |
//! | `{{>name}}`            | include another template                  |
//! | `{{! text }}`          | comment                                   |
//!
//! Names may be dotted (`customer.address.city`) and `.` refers to the
//! current item. Delimiter changes are rejected.
//!
//! # Examples
//!
//! ```rust
//! use stencil_cli::core::TemplateId;
//! use stencil_cli::templating::{GuardedLoader, MemoryLoader, MustacheCompiler, TemplateCompiler};
//! use serde_json::json;
//!
//! let mut templates = MemoryLoader::new()
//!     .with("greeting", "Hello {{>name}}!")
//!     .with("name", "{{first}}");
//! let mut loader = GuardedLoader::new(&mut templates, 500);
//!
//! let compiled = MustacheCompiler::new()
//!     .compile(&TemplateId::new("greeting"), &mut loader)
//!     .unwrap();
//! assert_eq!(compiled.execute(&json!({"first": "Ada"})).unwrap(), "Hello Ada!");
//! ```

pub mod compiler;
pub mod error;
pub mod executor;
pub mod guard;
pub mod loader;
mod parser;
pub mod segments;

pub use compiler::{CompiledTemplate, MustacheCompiler, MustacheTemplate, TemplateCompiler};
pub use error::TemplateError;
pub use executor::{faulty_partial_marker, faulty_var_marker};
pub use guard::RecursionGuard;
pub use loader::{GuardedLoader, MemoryLoader, RecordingLoader, SourceLoader, TemplateLoader};
pub use segments::RawSegment;
