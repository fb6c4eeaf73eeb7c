//! Document rendering: turning executed template HTML into artifact bytes.
//!
//! Producing the final document format (PDF, images, …) belongs to the host.
//! The engine only needs a [`DocumentRenderer`]; [`HtmlDocumentRenderer`]
//! passes the HTML through unchanged and is what the CLI uses.

pub mod diagnostic;

pub use diagnostic::{DiagnosticRenderer, DiagnosticReport};

use anyhow::Result;

/// Converts rendered HTML into document bytes.
pub trait DocumentRenderer: Send + Sync {
    /// Render `html` into the final document.
    fn render_document(&self, html: &str) -> Result<Vec<u8>>;

    /// File extension of produced documents, without the dot.
    fn extension(&self) -> &str;
}

/// Pass-through renderer producing UTF-8 HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDocumentRenderer;

impl DocumentRenderer for HtmlDocumentRenderer {
    fn render_document(&self, html: &str) -> Result<Vec<u8>> {
        Ok(html.as_bytes().to_vec())
    }

    fn extension(&self) -> &str {
        "html"
    }
}
