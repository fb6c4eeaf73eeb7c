//! stencil - Mustache template include graphs and document previews
//!
//! A directory of Mustache templates forms an include graph: root documents
//! pull in partials with `{{> name}}`, partials pull in further partials.
//! stencil scans that graph, works out which roots each template belongs to,
//! renders roots into artifacts and caches them, so that a change to any
//! template refreshes exactly the documents that use it.
//!
//! # Core Modules
//!
//! - [`core`] - [`TemplateId`](core::TemplateId), the crate error type and CLI error display
//! - [`source`] - template enumeration and the path/identifier mapping
//! - [`resolver`] - include extraction, the include graph and root resolution
//! - [`templating`] - the Mustache compiler, loaders and the recursion guard
//! - [`outline`] - variables, sections and includes of a compiled root
//! - [`cache`] - rendered artifacts, the per-root cache and the scratch store
//! - [`render`] - document renderers and the diagnostic page
//! - [`engine`] - [`TemplateEngine`](engine::TemplateEngine), tying everything together
//! - [`config`] - `stencil.toml`
//! - [`cli`] - the `stencil` command line
//!
//! # Example
//!
//! ```rust,no_run
//! use stencil_cli::core::TemplateId;
//! use stencil_cli::engine::TemplateEngine;
//!
//! # fn example() -> anyhow::Result<()> {
//! let engine = TemplateEngine::builder("templates")
//!     .data(serde_json::json!({"customer": {"name": "Ada"}}))
//!     .build()?;
//! engine.rebuild()?;
//!
//! // Which documents include the footer?
//! for root in engine.roots_for(&TemplateId::new("mail/footer")) {
//!     let artifact = engine.render(&root)?;
//!     println!("{root}: {} bytes", artifact.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration (`stencil.toml`)
//!
//! ```toml
//! templates_dir = "src/main/resources/templates"
//! scratch_dir = ".stencil/scratch"
//! data_file = "preview.json"
//! mock_vars = true
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod engine;
pub mod outline;
pub mod render;
pub mod resolver;
pub mod source;
pub mod templating;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
