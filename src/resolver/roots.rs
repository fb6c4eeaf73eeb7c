//! Root resolution over direct-parent edges.
//!
//! A root is a template nothing includes. The roots of a node are found by a
//! breadth-first walk up the parent edges: parentless frontier nodes are
//! collected, the others contribute their parents to the next frontier minus
//! everything already visited. The visited set makes the walk terminate on
//! cyclic graphs, and nodes that only reach themselves get no roots at all.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::TemplateId;

use super::include_graph::IncludeProps;

/// Roots reachable upward from `id`.
///
/// Returns an empty set for unknown nodes and for parentless nodes (the graph
/// makes those their own root after resolution).
pub fn resolve_roots(
    nodes: &BTreeMap<TemplateId, IncludeProps>,
    id: &TemplateId,
) -> BTreeSet<TemplateId> {
    let mut roots = BTreeSet::new();
    let Some(props) = nodes.get(id) else {
        return roots;
    };

    let mut frontier = props.direct_parents.clone();
    let mut visited = frontier.clone();

    while !frontier.is_empty() {
        let mut next = BTreeSet::new();
        for node in &frontier {
            match nodes.get(node).map(|p| &p.direct_parents) {
                Some(parents) if !parents.is_empty() => {
                    for parent in parents {
                        if visited.insert(parent.clone()) {
                            next.insert(parent.clone());
                        }
                    }
                }
                _ => {
                    roots.insert(node.clone());
                }
            }
        }
        frontier = next;
    }

    roots
}
