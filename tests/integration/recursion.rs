//! Self-including and cyclic templates.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use stencil_cli::core::{StencilError, TemplateId};
use stencil_cli::source::{FsTemplateSource, TemplateSource};
use stencil_cli::templating::TemplateError;
use stencil_cli::test_utils::TemplateTree;

/// File source counting how often the loop partial is read.
struct CountingSource {
    inner: FsTemplateSource,
    loop_reads: AtomicUsize,
}

impl TemplateSource for CountingSource {
    fn root(&self) -> &std::path::Path {
        self.inner.root()
    }

    fn list_files(&self) -> anyhow::Result<Vec<std::path::PathBuf>> {
        self.inner.list_files()
    }

    fn read_text(&self, path: &std::path::Path) -> anyhow::Result<String> {
        if path.file_stem().is_some_and(|stem| stem == "loop") {
            self.loop_reads.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.read_text(path)
    }

    fn is_file(&self, path: &std::path::Path) -> bool {
        self.inner.is_file(path)
    }
}

fn looping_tree() -> TemplateTree {
    TemplateTree::new()
        .with("page", "page:{{>loop}}")
        .with("loop", "x{{>loop}}")
        .with("other", "fine")
}

#[test]
fn test_self_include_fails_after_threshold_plus_one_requests() {
    let tree = looping_tree();
    let source = Arc::new(CountingSource {
        inner: FsTemplateSource::new(tree.root()),
        loop_reads: AtomicUsize::new(0),
    });
    let engine = tree.builder().source(source.clone()).build().unwrap();
    engine.rebuild().unwrap();
    let reads_after_scan = source.loop_reads.load(Ordering::SeqCst);

    let err = engine.render(&TemplateId::new("page")).unwrap_err();
    assert!(err.is_recursion(), "{err}");
    match err {
        StencilError::Template(TemplateError::RecursionDetected { name, count }) => {
            assert_eq!(name, TemplateId::new("loop"));
            assert_eq!(count, 501);
        }
        other => panic!("expected RecursionDetected, got {other}"),
    }
    // The 501st request is refused before reaching the file system
    assert_eq!(source.loop_reads.load(Ordering::SeqCst) - reads_after_scan, 500);
}

#[test]
fn test_rendering_self_include_directly_hits_guard() {
    let tree = TemplateTree::new().with("loop", "x{{>loop}}");
    let engine = tree.engine();
    engine.rebuild().unwrap();
    assert!(engine.roots_for(&TemplateId::new("loop")).is_empty());

    match engine.render(&TemplateId::new("loop")) {
        Err(StencilError::Template(TemplateError::RecursionDetected { name, count })) => {
            assert_eq!(name, TemplateId::new("loop"));
            assert_eq!(count, 501);
        }
        other => panic!("expected RecursionDetected, got {other:?}"),
    }
    assert_eq!(engine.cache_state(&TemplateId::new("loop")), None);

    let results = engine.render_roots_of(&TemplateId::new("loop"));
    assert_eq!(results.len(), 1);
    assert!(results[0].1.as_ref().is_err_and(StencilError::is_recursion));
}

#[test]
fn test_rendering_cycle_member_directly_hits_depth_limit() {
    let tree = TemplateTree::new()
        .with("ping", "ping {{>pong}}")
        .with("pong", "pong {{>ping}}");
    let engine = tree.builder().max_include_depth(40).build().unwrap();
    engine.rebuild().unwrap();

    let err = engine.render(&TemplateId::new("pong")).unwrap_err();
    assert!(matches!(
        err,
        StencilError::Template(TemplateError::IncludeDepthExceeded { limit: 40, .. })
    ));
}

#[test]
fn test_recursion_failure_leaves_graph_and_other_roots_intact() {
    let tree = looping_tree();
    let engine = tree.engine();
    engine.rebuild().unwrap();
    engine.render(&TemplateId::new("other")).unwrap();
    let graph_before = engine.graph();

    assert!(engine.render(&TemplateId::new("page")).is_err());
    assert_eq!(engine.cache_state(&TemplateId::new("page")), None);
    assert_eq!(*engine.graph(), *graph_before);
    assert_eq!(engine.cache_state(&TemplateId::new("other")), Some(false));

    let other = engine.render(&TemplateId::new("other")).unwrap();
    assert_eq!(other.bytes, b"fine");
    assert_eq!(engine.cache_stats().renders, 2);
}

#[test]
fn test_custom_threshold() {
    let tree = looping_tree();
    let engine = tree.builder().recursion_threshold(3).build().unwrap();
    engine.rebuild().unwrap();

    match engine.render(&TemplateId::new("page")) {
        Err(StencilError::Template(TemplateError::RecursionDetected { count, .. })) => {
            assert_eq!(count, 4);
        }
        other => panic!("expected RecursionDetected, got {other:?}"),
    }
}

#[test]
fn test_two_template_cycle_hits_depth_limit() {
    let tree = TemplateTree::new()
        .with("page", "{{>ping}}")
        .with("ping", "ping {{>pong}}")
        .with("pong", "pong {{>ping}}");
    let engine = tree.builder().max_include_depth(40).build().unwrap();
    engine.rebuild().unwrap();

    let err = engine.render(&TemplateId::new("page")).unwrap_err();
    assert!(err.is_recursion(), "{err}");
    assert!(matches!(
        err,
        StencilError::Template(TemplateError::IncludeDepthExceeded { limit: 40, .. })
    ));
}

#[test]
fn test_repeated_sibling_includes_are_not_recursion() {
    let row = "{{>cell}}".repeat(600);
    let tree = TemplateTree::new().with("table", &row).with("cell", "c");
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let artifact = engine.render(&TemplateId::new("table")).unwrap();
    assert_eq!(artifact.len(), 600);
}
