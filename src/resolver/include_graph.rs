//! The include graph: who includes whom, and which roots each template belongs to.
//!
//! The graph stores, per template, the set of templates that include it
//! directly and the derived set of roots. It is built in one pass over the
//! template tree and never mutated afterwards; the engine replaces it
//! wholesale on every rebuild and keeps the previous snapshot around.
//!
//! Cycles are ordinary edges here. Root resolution terminates on them and
//! [`IncludeGraph::cycles`] reports them using `petgraph`'s strongly
//! connected components.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::core::{StencilError, TemplateId};
use crate::source::{TemplateLayout, TemplateSource};

use super::extractor::IncludeExtractor;
use super::roots::resolve_roots;

/// Per-template edges and derived roots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncludeProps {
    /// Templates that include this one directly.
    pub direct_parents: BTreeSet<TemplateId>,
    /// Parentless templates that reach this one through includes.
    pub roots: BTreeSet<TemplateId>,
}

/// Snapshot of the include relationships of a template tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncludeGraph {
    nodes: BTreeMap<TemplateId, IncludeProps>,
    includes: BTreeMap<TemplateId, BTreeSet<TemplateId>>,
    roots: BTreeSet<TemplateId>,
    files: BTreeSet<TemplateId>,
}

impl IncludeGraph {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every template under the source root and build the graph.
    ///
    /// # Errors
    ///
    /// [`StencilError::TemplatesDirNotFound`] when the root directory is
    /// missing; [`StencilError::Other`] when the tree cannot be listed.
    /// Individual unreadable files are logged and contribute no includes.
    pub fn build(
        source: &dyn TemplateSource,
        layout: &TemplateLayout,
        extractor: &dyn IncludeExtractor,
    ) -> Result<Self, StencilError> {
        if !source.root_exists() {
            return Err(StencilError::TemplatesDirNotFound {
                path: source.root().to_path_buf(),
            });
        }

        tracing::debug!(root = %source.root().display(), suffix = layout.suffix(), "Scanning templates");
        let files = source.list_files()?;

        let mut graph = Self::new();
        for (id, path) in layout.templates(&files) {
            let includes = match source.read_text(path) {
                Ok(text) => extractor.extract(&id, &text),
                Err(e) => {
                    tracing::warn!(template = %id, error = %e, "Skipping unreadable template");
                    Vec::new()
                }
            };
            tracing::trace!(template = %id, includes = ?includes, "Extracted includes");
            graph.add_file(id, includes);
        }
        graph.resolve();

        tracing::debug!(
            nodes = graph.len(),
            roots = graph.roots.len(),
            files = graph.files.len(),
            "Include graph built"
        );
        Ok(graph)
    }

    /// Build a graph from `(file, includes)` pairs without touching a file system.
    pub fn from_files<I, T>(files: I) -> Self
    where
        I: IntoIterator<Item = (T, Vec<T>)>,
        T: Into<TemplateId>,
    {
        let mut graph = Self::new();
        for (id, includes) in files {
            graph.add_file(id.into(), includes.into_iter().map(Into::into).collect());
        }
        graph.resolve();
        graph
    }

    fn add_file(&mut self, id: TemplateId, includes: Vec<TemplateId>) {
        self.nodes.entry(id.clone()).or_default();
        self.files.insert(id.clone());

        for included in includes {
            self.nodes.entry(included.clone()).or_default().direct_parents.insert(id.clone());
            self.includes.entry(id.clone()).or_default().insert(included);
        }
    }

    fn resolve(&mut self) {
        let resolved: Vec<(TemplateId, BTreeSet<TemplateId>)> = self
            .nodes
            .keys()
            .map(|id| (id.clone(), resolve_roots(&self.nodes, id)))
            .collect();

        for (id, roots) in resolved {
            if let Some(props) = self.nodes.get_mut(&id) {
                props.roots = roots;
            }
        }

        self.roots.clear();
        for (id, props) in &mut self.nodes {
            if props.direct_parents.is_empty() {
                props.roots = BTreeSet::from([id.clone()]);
                self.roots.insert(id.clone());
            }
        }
    }

    /// Roots of `id`; empty when the template is unknown.
    #[must_use]
    pub fn roots_for(&self, id: &TemplateId) -> BTreeSet<TemplateId> {
        self.nodes.get(id).map(|props| props.roots.clone()).unwrap_or_default()
    }

    /// Edges and roots of `id`.
    #[must_use]
    pub fn props(&self, id: &TemplateId) -> Option<&IncludeProps> {
        self.nodes.get(id)
    }

    /// Templates included directly by `id`, sorted.
    #[must_use]
    pub fn includes_of(&self, id: &TemplateId) -> Vec<TemplateId> {
        self.includes.get(id).map(|set| set.iter().cloned().collect()).unwrap_or_default()
    }

    /// Parentless templates.
    #[must_use]
    pub fn roots(&self) -> &BTreeSet<TemplateId> {
        &self.roots
    }

    /// Templates backed by a scanned file.
    #[must_use]
    pub fn files(&self) -> &BTreeSet<TemplateId> {
        &self.files
    }

    /// Whether `id` is a node of the graph (file-backed or dangling).
    #[must_use]
    pub fn contains(&self, id: &TemplateId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Whether `id` is backed by a scanned file.
    #[must_use]
    pub fn is_file(&self, id: &TemplateId) -> bool {
        self.files.contains(id)
    }

    /// Number of nodes, dangling includes included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes with their props, in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&TemplateId, &IncludeProps)> {
        self.nodes.iter()
    }

    /// Included names that have no backing file, with the templates including them.
    #[must_use]
    pub fn dangling(&self) -> Vec<(TemplateId, BTreeSet<TemplateId>)> {
        self.nodes
            .iter()
            .filter(|(id, _)| !self.files.contains(*id))
            .map(|(id, props)| (id.clone(), props.direct_parents.clone()))
            .collect()
    }

    /// File-backed templates that no root reaches (members of include cycles and what they include).
    #[must_use]
    pub fn unreachable(&self) -> Vec<TemplateId> {
        self.nodes
            .iter()
            .filter(|(id, props)| self.files.contains(*id) && props.roots.is_empty())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Roots present in `previous` that are gone from this graph.
    #[must_use]
    pub fn removed_roots(&self, previous: &IncludeGraph) -> BTreeSet<TemplateId> {
        previous.roots.difference(&self.roots).cloned().collect()
    }

    /// Include cycles: strongly connected components with more than one
    /// template, plus templates including themselves. Sorted for stable output.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<TemplateId>> {
        let mut graph: DiGraph<TemplateId, ()> = DiGraph::new();
        let mut index: HashMap<&TemplateId, NodeIndex> = HashMap::new();
        for id in self.nodes.keys() {
            index.insert(id, graph.add_node(id.clone()));
        }
        for (parent, children) in &self.includes {
            for child in children {
                if let (Some(&from), Some(&to)) = (index.get(parent), index.get(child)) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let mut cycles: Vec<Vec<TemplateId>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component.first().is_some_and(|&n| graph.contains_edge(n, n))
            })
            .map(|component| {
                let mut ids: Vec<TemplateId> =
                    component.into_iter().map(|n| graph[n].clone()).collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Human-readable include tree below `root`.
    ///
    /// Templates already expanded elsewhere are marked `(*)`, includes
    /// closing a cycle `(circular reference)` and dangling includes
    /// `(missing)`. `max_depth` limits how many include levels are shown.
    #[must_use]
    pub fn to_tree_string(&self, root: &TemplateId, max_depth: Option<usize>) -> String {
        let mut result = format!("{root}\n");
        let mut expanded = HashSet::new();
        let mut path = vec![root.clone()];
        expanded.insert(root.clone());
        self.build_tree_string(root, &mut result, "", 1, max_depth, &mut path, &mut expanded);
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn build_tree_string(
        &self,
        node: &TemplateId,
        result: &mut String,
        prefix: &str,
        depth: usize,
        max_depth: Option<usize>,
        path: &mut Vec<TemplateId>,
        expanded: &mut HashSet<TemplateId>,
    ) {
        if max_depth.is_some_and(|max| depth > max) {
            return;
        }

        let children = self.includes_of(node);
        for (i, child) in children.iter().enumerate() {
            let is_last = i == children.len() - 1;
            let connector = if is_last {
                "└── "
            } else {
                "├── "
            };

            let marker = if path.contains(child) {
                " (circular reference)"
            } else if !self.files.contains(child) {
                " (missing)"
            } else if expanded.contains(child) {
                " (*)"
            } else {
                ""
            };
            result.push_str(&format!("{prefix}{connector}{child}{marker}\n"));

            if marker.is_empty() {
                expanded.insert(child.clone());
                let child_prefix = if is_last {
                    format!("{prefix}    ")
                } else {
                    format!("{prefix}│   ")
                };
                path.push(child.clone());
                self.build_tree_string(
                    child,
                    result,
                    &child_prefix,
                    depth + 1,
                    max_depth,
                    path,
                    expanded,
                );
                path.pop();
            }
        }
    }
}
