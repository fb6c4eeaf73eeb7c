//! Include graph scans through the engine.

use std::collections::BTreeSet;

use stencil_cli::core::{StencilError, TemplateId};
use stencil_cli::engine::TemplateEngine;
use stencil_cli::resolver::ExtractionMode;
use stencil_cli::test_utils::{TemplateTree, init_test_logging};

fn ids(names: &[&str]) -> BTreeSet<TemplateId> {
    names.iter().map(|name| TemplateId::new(*name)).collect()
}

/// A includes B, B includes C, D includes C.
fn scenario() -> TemplateTree {
    TemplateTree::new()
        .with("A", "A[{{>B}}]")
        .with("B", "B[{{>C}}]")
        .with("C", "C")
        .with("D", "D[{{> C }}]")
}

#[test]
fn test_roots_of_shared_partial() {
    init_test_logging(None);
    let tree = scenario();
    let engine = tree.engine();
    engine.rebuild().unwrap();

    assert_eq!(engine.roots_for(&TemplateId::new("C")), ids(&["A", "D"]));
    assert_eq!(engine.roots_for(&TemplateId::new("B")), ids(&["A"]));
    assert_eq!(engine.roots_for(&TemplateId::new("A")), ids(&["A"]));
    assert_eq!(engine.graph().roots(), &ids(&["A", "D"]));
    assert!(engine.roots_for(&TemplateId::new("unknown")).is_empty());
}

#[test]
fn test_probing_extraction_agrees_with_textual() {
    let tree = scenario()
        .with("mail/letter", "{{#items}}{{>mail/row}}{{/items}}{{^items}}{{> mail//empty}}{{/items}}")
        .with("mail/row", "{{name}}")
        .with("mail/empty", "none");

    let textual = tree.engine();
    textual.rebuild().unwrap();
    let probing = tree.builder().extraction(ExtractionMode::Probing).build().unwrap();
    probing.rebuild().unwrap();

    assert_eq!(*textual.graph(), *probing.graph());
    assert_eq!(probing.roots_for(&TemplateId::new("mail/empty")), ids(&["mail/letter"]));
}

#[test]
fn test_rebuild_is_idempotent() {
    let tree = scenario();
    let engine = tree.engine();
    engine.rebuild().unwrap();
    engine.rebuild().unwrap();

    assert_eq!(*engine.graph(), *engine.previous_graph());
}

#[test]
fn test_chain_has_single_top_root() {
    let tree = TemplateTree::new();
    for level in 0..20 {
        tree.write(&format!("level{level}"), &format!("{{{{>level{}}}}}", level + 1));
    }
    tree.write("level20", "bottom");

    let engine = tree.engine();
    engine.rebuild().unwrap();
    for level in 0..=20 {
        assert_eq!(engine.roots_for(&TemplateId::new(format!("level{level}"))), ids(&["level0"]));
    }
}

#[test]
fn test_cycles_resolve_without_roots() {
    // X -> Y -> Z -> Y, R -> Z
    let tree = TemplateTree::new()
        .with("X", "{{>Y}}")
        .with("Y", "{{>Z}}")
        .with("Z", "{{>Y}}")
        .with("R", "{{>Z}}")
        .with("P", "{{>Q}}")
        .with("Q", "{{>P}}");
    let engine = tree.engine();
    engine.rebuild().unwrap();

    assert_eq!(engine.roots_for(&TemplateId::new("Z")), ids(&["R", "X"]));
    assert_eq!(engine.roots_for(&TemplateId::new("Y")), ids(&["R", "X"]));
    assert!(engine.roots_for(&TemplateId::new("P")).is_empty());
    assert!(engine.roots_for(&TemplateId::new("Q")).is_empty());

    let graph = engine.graph();
    let cycles = graph.cycles();
    let names: Vec<Vec<&str>> = cycles
        .iter()
        .map(|cycle| cycle.iter().map(TemplateId::as_str).collect())
        .collect();
    assert_eq!(names, vec![vec!["P", "Q"], vec!["Y", "Z"]]);
    assert_eq!(graph.unreachable(), vec![TemplateId::new("P"), TemplateId::new("Q")]);
}

#[test]
fn test_dangling_includes_are_nodes_without_files() {
    let tree = TemplateTree::new().with("A", "{{>ghost}}{{>B}}").with("B", "b");
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let graph = engine.graph();
    assert!(graph.contains(&TemplateId::new("ghost")));
    assert!(!graph.is_file(&TemplateId::new("ghost")));
    assert_eq!(graph.dangling(), vec![(TemplateId::new("ghost"), ids(&["A"]))]);
    assert_eq!(engine.roots_for(&TemplateId::new("ghost")), ids(&["A"]));
}

#[test]
fn test_parent_segments_in_includes() {
    let tree = TemplateTree::new()
        .with("page", "{{>mail/parts/../footer}}{{>../secret}}")
        .with("mail/footer", "f");
    std::fs::write(tree.base().join("secret.mustache"), "OUTSIDE").unwrap();
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let graph = engine.graph();
    assert_eq!(
        graph.includes_of(&TemplateId::new("page")),
        vec![TemplateId::new("../secret"), TemplateId::new("mail/footer")]
    );
    assert_eq!(engine.roots_for(&TemplateId::new("mail/footer")), ids(&["page"]));
    assert_eq!(graph.dangling(), vec![(TemplateId::new("../secret"), ids(&["page"]))]);
}

#[test]
fn test_foreign_files_and_malformed_markers_are_ignored() {
    let tree = TemplateTree::new().with("A", "{{>B}} and {{>broken");
    std::fs::write(tree.root().join("notes.txt"), "{{>A}}").unwrap();
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let graph = engine.graph();
    assert_eq!(graph.files(), &ids(&["A"]));
    assert_eq!(graph.includes_of(&TemplateId::new("A")), vec![TemplateId::new("B")]);
}

#[test]
fn test_missing_templates_dir_is_configuration_error() {
    let tree = scenario();
    let engine = TemplateEngine::builder(tree.base().join("nope")).build().unwrap();

    let err = engine.rebuild().unwrap_err();
    assert!(matches!(err, StencilError::TemplatesDirNotFound { .. }));
    assert!(err.is_configuration());
}

#[test]
fn test_failed_rebuild_keeps_current_graph() {
    let tree = scenario();
    let engine = tree.engine();
    engine.rebuild().unwrap();

    std::fs::rename(tree.root(), tree.base().join("moved")).unwrap();
    assert!(engine.rebuild().is_err());
    assert_eq!(engine.roots_for(&TemplateId::new("C")), ids(&["A", "D"]));
}

#[test]
fn test_template_id_for_path() {
    let tree = scenario().with("mail/footer", "bye");
    let engine = tree.engine();

    assert_eq!(
        engine.template_id_for_path(&tree.path("mail/footer")),
        Some(TemplateId::new("mail/footer"))
    );
    assert_eq!(
        engine.template_id_for_path(std::path::Path::new("mail/footer.mustache")),
        Some(TemplateId::new("mail/footer"))
    );
    assert_eq!(engine.template_id_for_path(&tree.root().join("notes.txt")), None);
    assert_eq!(engine.template_id_for_path(&tree.base().join("outside.mustache")), None);
}
