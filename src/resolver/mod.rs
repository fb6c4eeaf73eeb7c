//! Include graph construction and root resolution.
//!
//! - [`extractor`] - finding the includes of a single template
//! - [`include_graph`] - the per-tree [`IncludeGraph`] snapshot
//! - [`roots`] - the breadth-first root walk
//!
//! # Example
//!
//! ```rust
//! use stencil_cli::core::TemplateId;
//! use stencil_cli::resolver::IncludeGraph;
//!
//! let graph = IncludeGraph::from_files([
//!     ("A", vec!["B"]),
//!     ("B", vec!["C"]),
//!     ("D", vec!["C"]),
//! ]);
//! let roots: Vec<_> = graph.roots_for(&TemplateId::new("C")).into_iter().collect();
//! assert_eq!(roots, [TemplateId::new("A"), TemplateId::new("D")]);
//! ```

pub mod extractor;
pub mod include_graph;
pub mod roots;

pub use extractor::{
    ExtractionMode, IncludeExtractor, ProbingExtractor, TextualExtractor, extract_includes,
};
pub use include_graph::{IncludeGraph, IncludeProps};
pub use roots::resolve_roots;
