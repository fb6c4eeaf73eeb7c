//! Include extraction.
//!
//! Two strategies produce the direct includes of a template:
//!
//! - [`TextualExtractor`] scans the text for `{{>` … `}}` markers without
//!   interpreting the template, so the graph can be built before any
//!   template is loadable. An open marker with no close is skipped.
//! - [`ProbingExtractor`] compiles the template through a
//!   [`RecordingLoader`] that answers every include request with an empty
//!   placeholder, and reports every name the compiler asked for. It follows
//!   the real grammar but needs a compilable template.
//!
//! On well-formed templates both return the same names.

use serde::{Deserialize, Serialize};

use crate::core::TemplateId;
use crate::source::{TemplateLayout, TemplateSource};
use crate::templating::{RecordingLoader, TemplateCompiler};

const INCLUDE_OPEN: &str = "{{>";
const INCLUDE_CLOSE: &str = "}}";

/// Which extractor the graph scanner uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Pure text scan
    #[default]
    Textual,
    /// Compile against placeholders and record loader requests
    Probing,
}

/// Produces the direct includes of one template.
pub trait IncludeExtractor: Send + Sync {
    /// Distinct included names in first-occurrence order.
    fn extract(&self, id: &TemplateId, text: &str) -> Vec<TemplateId>;
}

/// Textual include scan.
///
/// ```
/// use stencil_cli::resolver::extract_includes;
///
/// let names = extract_includes("{{> header}} body {{>footer}} {{> broken");
/// let names: Vec<_> = names.iter().map(|n| n.as_str()).collect();
/// assert_eq!(names, ["header", "footer"]);
/// ```
#[must_use]
pub fn extract_includes(text: &str) -> Vec<TemplateId> {
    let mut includes: Vec<TemplateId> = Vec::new();
    for segment in text.split(INCLUDE_OPEN).skip(1) {
        let Some(end) = segment.find(INCLUDE_CLOSE) else {
            continue;
        };
        let id = TemplateId::new(&segment[..end]);
        if !id.is_empty() && !includes.contains(&id) {
            includes.push(id);
        }
    }
    includes
}

/// [`IncludeExtractor`] using [`extract_includes`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TextualExtractor;

impl IncludeExtractor for TextualExtractor {
    fn extract(&self, _id: &TemplateId, text: &str) -> Vec<TemplateId> {
        extract_includes(text)
    }
}

/// [`IncludeExtractor`] that compiles templates through a [`RecordingLoader`].
pub struct ProbingExtractor<'a> {
    compiler: &'a dyn TemplateCompiler,
    source: &'a dyn TemplateSource,
    layout: &'a TemplateLayout,
}

impl<'a> ProbingExtractor<'a> {
    /// Probe with `compiler`; `source` and `layout` decide whether a requested name exists.
    pub fn new(
        compiler: &'a dyn TemplateCompiler,
        source: &'a dyn TemplateSource,
        layout: &'a TemplateLayout,
    ) -> Self {
        Self {
            compiler,
            source,
            layout,
        }
    }
}

impl IncludeExtractor for ProbingExtractor<'_> {
    fn extract(&self, id: &TemplateId, text: &str) -> Vec<TemplateId> {
        let mut loader = RecordingLoader::new(id.clone(), text.to_string(), |name| {
            self.layout.exists(self.source, name)
        });

        match self.compiler.compile(id, &mut loader) {
            Ok(_) => {
                if !loader.missing().is_empty() {
                    tracing::debug!(
                        template = %id,
                        missing = ?loader.missing(),
                        "Probed template requested missing includes"
                    );
                }
                loader.into_requested()
            }
            Err(e) => {
                tracing::warn!(template = %id, error = %e, "Probing failed; template contributes no includes");
                Vec::new()
            }
        }
    }
}
