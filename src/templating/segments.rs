//! Backend-neutral view of a compiled template.
//!
//! Every [`CompiledTemplate`](super::CompiledTemplate) exposes its structure
//! as a list of [`RawSegment`]s. The outline extractor only ever sees this
//! type, never the internals of a particular compiler.

use serde::Serialize;

/// One structural element of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawSegment {
    /// Literal text.
    Text(String),
    /// A variable reference.
    Variable {
        /// Referenced name, as written
        name: String,
        /// 1-based source line
        line: usize,
    },
    /// A section (`{{#name}}`).
    Section {
        /// Section name
        name: String,
        /// 1-based source line of the opening tag
        line: usize,
        /// Nested segments
        children: Vec<RawSegment>,
    },
    /// An inverted section (`{{^name}}`).
    InvertedSection {
        /// Section name
        name: String,
        /// 1-based source line of the opening tag
        line: usize,
        /// Nested segments
        children: Vec<RawSegment>,
    },
    /// A sub-include (`{{>name}}`).
    Include {
        /// Included template name
        name: String,
        /// 1-based source line
        line: usize,
        /// Segments of the included template; empty when it could not be loaded
        children: Vec<RawSegment>,
    },
    /// Backend bookkeeping with no name or line (comments and similar).
    Opaque,
}

impl RawSegment {
    /// Name and line of structural segments, `None` for text and opaque nodes.
    #[must_use]
    pub fn name_and_line(&self) -> Option<(&str, usize)> {
        match self {
            Self::Variable { name, line }
            | Self::Section { name, line, .. }
            | Self::InvertedSection { name, line, .. }
            | Self::Include { name, line, .. } => Some((name, *line)),
            Self::Text(_) | Self::Opaque => None,
        }
    }
}
