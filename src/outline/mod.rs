//! Outline extraction from compiled templates.
//!
//! The outline is the navigable structure of a rendered root: its sections,
//! inverted sections, variable references and includes, each with the line
//! it was written on and the template ("fragment") it was written in.
//! It is built from [`RawSegment`]s, so it works for any compiler backend.
//!
//! Includes switch the fragment context to the included template; sections
//! keep the context of the template that contains them. Literal text and
//! backend bookkeeping segments are dropped.

use serde::Serialize;
use std::fmt;

use crate::core::TemplateId;
use crate::templating::RawSegment;

/// Kind of an outline node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlineKind {
    /// `{{name}}`
    Variable,
    /// `{{#name}}`
    Section,
    /// `{{^name}}`
    InvertedSection,
    /// `{{>name}}`
    Include,
}

impl OutlineKind {
    /// Sigil used when displaying nodes of this kind.
    #[must_use]
    pub fn sigil(self) -> &'static str {
        match self {
            Self::Variable => "",
            Self::Section => "#",
            Self::InvertedSection => "^",
            Self::Include => ">",
        }
    }
}

/// One structural element of a rendered template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineNode {
    /// Template the element was written in.
    pub parent_fragment: TemplateId,
    /// Name as written in the source.
    pub name: String,
    /// 1-based source line within `parent_fragment`.
    pub source_line: usize,
    /// Element kind.
    pub kind: OutlineKind,
    /// Nested elements.
    pub children: Vec<OutlineNode>,
    /// For includes, whether a template file with this name exists.
    pub include_valid: bool,
}

impl OutlineNode {
    /// The name with separators normalized (`/parts//row` becomes `parts/row`).
    #[must_use]
    pub fn normalized_name(&self) -> String {
        TemplateId::new(&self.name).to_string()
    }

    /// Number of nodes in this subtree, this one included.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::count).sum::<usize>()
    }
}

impl fmt::Display for OutlineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OutlineKind::Include => {
                write!(f, ">/{}, line={}", self.normalized_name(), self.source_line)
            }
            kind => write!(f, "{}{}, line={}", kind.sigil(), self.name, self.source_line),
        }
    }
}

/// Outline of one root template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineTree {
    /// The root template.
    pub root: TemplateId,
    /// Top-level nodes in source order.
    pub nodes: Vec<OutlineNode>,
}

impl OutlineTree {
    /// Extract the outline of `root` from its compiled segments.
    ///
    /// `include_exists` decides [`OutlineNode::include_valid`].
    pub fn extract(
        root: &TemplateId,
        segments: &[RawSegment],
        include_exists: &dyn Fn(&TemplateId) -> bool,
    ) -> Self {
        Self {
            root: root.clone(),
            nodes: extract_nodes(root, segments, include_exists),
        }
    }

    /// Total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(OutlineNode::count).sum()
    }

    /// Include nodes whose template does not exist, depth-first.
    #[must_use]
    pub fn invalid_includes(&self) -> Vec<&OutlineNode> {
        let mut found = Vec::new();
        let mut stack: Vec<&OutlineNode> = self.nodes.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if node.kind == OutlineKind::Include && !node.include_valid {
                found.push(node);
            }
            stack.extend(node.children.iter().rev());
        }
        found
    }

    /// Box-drawing rendering of the outline.
    #[must_use]
    pub fn to_tree_string(&self) -> String {
        let mut result = format!("{}\n", self.root);
        write_nodes(&self.nodes, "", &mut result);
        result
    }
}

impl fmt::Display for OutlineTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_tree_string())
    }
}

fn write_nodes(nodes: &[OutlineNode], prefix: &str, result: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i == nodes.len() - 1;
        let connector = if is_last {
            "└── "
        } else {
            "├── "
        };
        let missing = if node.kind == OutlineKind::Include && !node.include_valid {
            " (missing)"
        } else {
            ""
        };
        result.push_str(&format!("{prefix}{connector}{node}{missing}\n"));

        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };
        write_nodes(&node.children, &child_prefix, result);
    }
}

/// Walk `segments` written in `fragment` and build outline nodes.
pub fn extract_nodes(
    fragment: &TemplateId,
    segments: &[RawSegment],
    include_exists: &dyn Fn(&TemplateId) -> bool,
) -> Vec<OutlineNode> {
    segments
        .iter()
        .filter_map(|segment| {
            let (name, line) = segment.name_and_line()?;
            let node = |kind, children| OutlineNode {
                parent_fragment: fragment.clone(),
                name: name.to_string(),
                source_line: line,
                kind,
                children,
                include_valid: false,
            };

            Some(match segment {
                RawSegment::Variable { .. } => node(OutlineKind::Variable, Vec::new()),
                RawSegment::Section { children, .. } => node(
                    OutlineKind::Section,
                    extract_nodes(fragment, children, include_exists),
                ),
                RawSegment::InvertedSection { children, .. } => node(
                    OutlineKind::InvertedSection,
                    extract_nodes(fragment, children, include_exists),
                ),
                RawSegment::Include { children, .. } => {
                    let included = TemplateId::new(name);
                    let mut include =
                        node(OutlineKind::Include, extract_nodes(&included, children, include_exists));
                    include.include_valid = include_exists(&included);
                    include
                }
                RawSegment::Text(_) | RawSegment::Opaque => return None,
            })
        })
        .collect()
}
