//! Diagnostic documents for roots whose rendering came out empty.
//!
//! The page is a small Tera template registered under an `.html` name, so
//! Tera autoescapes everything interpolated into it (template names and
//! messages come from user files).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tera::{Context as TeraContext, Tera};

use crate::core::TemplateId;

const TEMPLATE_NAME: &str = "diagnostic.html";

const DIAGNOSTIC_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Rendering failed: {{ root }}</title>
</head>
<body>
<h1 style="color: red;">{{ root }}</h1>
<p>{{ message }}</p>
{% if details %}<ul>
{% for detail in details %}<li>{{ detail }}</li>
{% endfor %}</ul>
{% endif %}<p><small>Generated {{ generated_at }}</small></p>
</body>
</html>
"#;

/// What the diagnostic page reports.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    /// Root whose document could not be produced
    pub root: TemplateId,
    /// Headline message
    pub message: String,
    /// Additional facts (outline size, missing includes, …)
    pub details: Vec<String>,
    /// When the report was generated
    pub generated_at: DateTime<Utc>,
}

impl DiagnosticReport {
    /// Report for `root` with a headline `message`.
    pub fn new(root: TemplateId, message: impl Into<String>) -> Self {
        Self {
            root,
            message: message.into(),
            details: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    /// Add a detail line.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }
}

/// Renders [`DiagnosticReport`]s to HTML.
pub struct DiagnosticRenderer {
    tera: Tera,
}

impl DiagnosticRenderer {
    /// Compile the built-in diagnostic page.
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, DIAGNOSTIC_TEMPLATE)
            .context("Failed to compile diagnostic template")?;
        Ok(Self {
            tera,
        })
    }

    /// Render `report` to HTML.
    pub fn render(&self, report: &DiagnosticReport) -> Result<String> {
        let context =
            TeraContext::from_serialize(report).context("Failed to build diagnostic context")?;
        let html = self
            .tera
            .render(TEMPLATE_NAME, &context)
            .with_context(|| format!("Failed to render diagnostic page for '{}'", report.root))?;
        tracing::debug!(root = %report.root, "Rendered diagnostic page");
        Ok(html)
    }
}
