//! Outlines of rendered roots.

use stencil_cli::core::TemplateId;
use stencil_cli::outline::OutlineKind;
use stencil_cli::test_utils::TemplateTree;

#[test]
fn test_outline_round_trip() {
    let tree = TemplateTree::new()
        .with("root", "{{#a}}{{b}}{{/a}}{{^c}}{{>d}}{{/c}}")
        .with("d", "{{e}}");
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let outline = engine.outline(&TemplateId::new("root")).unwrap();
    assert_eq!(outline.root, TemplateId::new("root"));
    assert_eq!(outline.nodes.len(), 2);

    let section = &outline.nodes[0];
    assert_eq!((section.kind, section.name.as_str()), (OutlineKind::Section, "a"));
    assert_eq!(section.children.len(), 1);
    assert_eq!(section.children[0].kind, OutlineKind::Variable);
    assert_eq!(section.children[0].name, "b");
    assert_eq!(section.children[0].parent_fragment, TemplateId::new("root"));

    let inverted = &outline.nodes[1];
    assert_eq!((inverted.kind, inverted.name.as_str()), (OutlineKind::InvertedSection, "c"));
    let include = &inverted.children[0];
    assert_eq!(include.kind, OutlineKind::Include);
    assert_eq!(include.name, "d");
    assert!(include.include_valid);

    // Nodes inside the include belong to the included template
    assert_eq!(include.children[0].name, "e");
    assert_eq!(include.children[0].parent_fragment, TemplateId::new("d"));
    assert_eq!(outline.node_count(), 5);
}

#[test]
fn test_outline_marks_missing_includes() {
    let tree = TemplateTree::new().with("root", "line one\n{{>/parts//ghost}}");
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let outline = engine.outline(&TemplateId::new("root")).unwrap();
    let invalid = outline.invalid_includes();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].normalized_name(), "parts/ghost");
    assert_eq!(invalid[0].source_line, 2);
    assert_eq!(invalid[0].to_string(), ">/parts/ghost, line=2");
    assert!(outline.to_tree_string().contains("(missing)"));
}

#[test]
fn test_outline_is_served_from_cache() {
    let tree = TemplateTree::new().with("root", "{{x}}");
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let rendered = engine.render(&TemplateId::new("root")).unwrap();
    let outline = engine.outline(&TemplateId::new("root")).unwrap();
    assert_eq!(outline, rendered.outline);
    assert_eq!(engine.cache_stats().renders, 1);
}

#[test]
fn test_outline_serializes_to_json() {
    let tree = TemplateTree::new().with("root", "{{#items}}{{name}}{{/items}}");
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let outline = engine.outline(&TemplateId::new("root")).unwrap();
    let json = serde_json::to_value(&outline).unwrap();
    assert_eq!(json["root"], "root");
    assert_eq!(json["nodes"][0]["name"], "items");
    assert_eq!(json["nodes"][0]["children"][0]["source_line"], 1);
}
