//! Cache hits, invalidation and the file-change hooks.

use std::collections::BTreeSet;
use std::sync::Arc;

use stencil_cli::core::TemplateId;
use stencil_cli::templating::faulty_partial_marker;
use stencil_cli::test_utils::TemplateTree;

fn ids(names: &[&str]) -> BTreeSet<TemplateId> {
    names.iter().map(|name| TemplateId::new(*name)).collect()
}

fn text(engine: &stencil_cli::engine::TemplateEngine, root: &str) -> String {
    let artifact = engine.render(&TemplateId::new(root)).unwrap();
    String::from_utf8(artifact.bytes.clone()).unwrap()
}

fn scenario() -> TemplateTree {
    TemplateTree::new()
        .with("A", "A[{{>B}}]")
        .with("B", "B[{{>C}}]")
        .with("C", "C")
        .with("D", "D[{{>C}}]")
}

#[test]
fn test_second_render_is_a_cache_hit() {
    let tree = scenario();
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let first = engine.render(&TemplateId::new("A")).unwrap();
    let second = engine.render(&TemplateId::new("A")).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.bytes, b"A[B[C]]");
    let stats = engine.cache_stats();
    assert_eq!((stats.renders, stats.hits, stats.entries), (1, 1, 1));
}

#[test]
fn test_invalidate_forces_recompute_of_that_root_only() {
    let tree = scenario();
    let engine = tree.engine();
    engine.rebuild().unwrap();
    engine.render(&TemplateId::new("A")).unwrap();
    engine.render(&TemplateId::new("D")).unwrap();

    assert_eq!(engine.invalidate(&ids(&["A", "unknown"])), 1);
    assert_eq!(engine.cache_state(&TemplateId::new("A")), Some(true));
    assert_eq!(engine.cache_state(&TemplateId::new("D")), Some(false));

    engine.render(&TemplateId::new("A")).unwrap();
    engine.render(&TemplateId::new("D")).unwrap();
    assert_eq!(engine.cache_stats().renders, 3);

    assert_eq!(engine.invalidate_all(), 2);
    engine.render(&TemplateId::new("D")).unwrap();
    assert_eq!(engine.cache_stats().renders, 4);
}

#[test]
fn test_editing_shared_partial_invalidates_all_its_roots() {
    let tree = scenario().with("E", "E");
    let engine = tree.engine();
    engine.rebuild().unwrap();
    for root in ["A", "D", "E"] {
        engine.render(&TemplateId::new(root)).unwrap();
    }

    let changed = tree.write("C", "C2");
    let affected = engine.template_changed(&[changed]).unwrap();

    assert_eq!(affected, ids(&["A", "D"]));
    assert_eq!(engine.cache_state(&TemplateId::new("E")), Some(false));
    assert_eq!(text(&engine, "A"), "A[B[C2]]");
    assert_eq!(text(&engine, "D"), "D[C2]");
}

#[test]
fn test_new_include_edge_invalidates_new_root() {
    let tree = scenario().with("E", "E");
    let engine = tree.engine();
    engine.rebuild().unwrap();
    engine.render(&TemplateId::new("E")).unwrap();

    // C now pulls in E, so E stops being a root
    let changed = tree.write("C", "C{{>E}}");
    let affected = engine.template_changed(&[changed]).unwrap();

    assert_eq!(affected, ids(&["A", "D"]));
    assert_eq!(engine.graph().roots(), &ids(&["A", "D"]));
    assert_eq!(engine.cache_state(&TemplateId::new("E")), None);
    assert_eq!(text(&engine, "D"), "D[CE]");
}

#[test]
fn test_deleting_partial_marks_include_faulty() {
    let tree = scenario();
    let engine = tree.engine();
    engine.rebuild().unwrap();
    assert_eq!(text(&engine, "D"), "D[C]");

    let removed = tree.remove("C");
    let affected = engine.template_changed(&[removed]).unwrap();

    assert_eq!(affected, ids(&["A", "D"]));
    assert_eq!(text(&engine, "D"), format!("D[{}]", faulty_partial_marker("C")));
}

#[test]
fn test_moving_root_evicts_old_entry_and_scratch_file() {
    let tree = scenario();
    let scratch_dir = tree.base().join("scratch");
    let engine = tree.builder().scratch_dir(&scratch_dir).build().unwrap();
    engine.rebuild().unwrap();

    let artifact = engine.render(&TemplateId::new("D")).unwrap();
    let scratch_path = artifact.path.clone().unwrap();
    assert_eq!(scratch_path, scratch_dir.join("D.mtf.html"));
    assert!(scratch_path.is_file());

    let (from, to) = tree.rename("D", "reports/D");
    let affected = engine.template_moved(&from, &to).unwrap();

    assert_eq!(affected, ids(&["D", "reports/D"]));
    assert_eq!(engine.cache_state(&TemplateId::new("D")), None);
    assert!(!scratch_path.exists());
    assert_eq!(engine.root_for_artifact(artifact.handle), None);

    let moved = engine.render(&TemplateId::new("reports/D")).unwrap();
    assert_eq!(moved.path, Some(scratch_dir.join("reports_D.mtf.html")));
}

#[test]
fn test_reverse_lookup_of_artifacts() {
    let tree = scenario();
    let scratch_dir = tree.base().join("scratch");
    let engine = tree.builder().scratch_dir(&scratch_dir).build().unwrap();
    engine.rebuild().unwrap();

    let artifact = engine.render(&TemplateId::new("A")).unwrap();
    assert_eq!(engine.root_for_artifact(artifact.handle), Some(TemplateId::new("A")));
    assert_eq!(
        engine.root_for_artifact_path(&scratch_dir.join("A.mtf.html")),
        Some(TemplateId::new("A"))
    );
    // Known root that was never rendered
    assert_eq!(
        engine.root_for_artifact_path(&scratch_dir.join("D.mtf.html")),
        Some(TemplateId::new("D"))
    );
    assert_eq!(engine.root_for_artifact_path(&scratch_dir.join("zzz.mtf.html")), None);

    assert_eq!(engine.purge_scratch().unwrap(), 1);
    assert!(!scratch_dir.join("A.mtf.html").exists());
}

#[test]
fn test_rerendered_root_only_resolves_latest_handle() {
    let tree = scenario();
    let engine = tree.engine();
    engine.rebuild().unwrap();
    let root = TemplateId::new("A");

    let first = engine.render(&root).unwrap();
    engine.invalidate([&root]);
    let second = engine.render(&root).unwrap();

    assert_ne!(first.handle, second.handle);
    assert_eq!(engine.root_for_artifact(first.handle), None);
    assert_eq!(engine.root_for_artifact(second.handle), Some(root));
}

#[test]
fn test_unrelated_paths_change_nothing() {
    let tree = scenario();
    let engine = tree.engine();
    engine.rebuild().unwrap();
    engine.render(&TemplateId::new("A")).unwrap();

    let affected = engine.template_changed(&[tree.root().join("notes.txt")]).unwrap();
    assert!(affected.is_empty());
    assert_eq!(engine.cache_state(&TemplateId::new("A")), Some(false));
}
