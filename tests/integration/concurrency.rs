//! Async and bulk rendering.

use std::collections::BTreeMap;

use stencil_cli::core::TemplateId;
use stencil_cli::test_utils::TemplateTree;

fn wide_tree(roots: usize) -> TemplateTree {
    let tree = TemplateTree::new().with("shared/footer", "footer");
    for i in 0..roots {
        tree.write(&format!("doc{i}"), &format!("doc {i} {{{{>shared/footer}}}}"));
    }
    tree
}

#[tokio::test]
async fn test_render_all_renders_every_root_once() {
    let tree = wide_tree(12);
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let results = engine.render_all().await;
    assert_eq!(results.len(), 12);

    let outputs: BTreeMap<String, String> = results
        .into_iter()
        .map(|(root, result)| {
            let bytes = result.unwrap().bytes.clone();
            (root.to_string(), String::from_utf8(bytes).unwrap())
        })
        .collect();
    assert_eq!(outputs["doc3"], "doc 3 footer");
    assert_eq!(engine.cache_stats().renders, 12);

    // Second pass is served from the cache
    let again = engine.render_all().await;
    assert!(again.iter().all(|(_, result)| result.is_ok()));
    assert_eq!(engine.cache_stats().renders, 12);
    assert_eq!(engine.cache_stats().hits, 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_for_one_root_render_once() {
    let tree = wide_tree(1);
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.render_async(TemplateId::new("doc0")).await })
        })
        .collect();

    let mut digests = Vec::new();
    for task in tasks {
        digests.push(task.await.unwrap().unwrap().digest.clone());
    }

    digests.dedup();
    assert_eq!(digests.len(), 1);
    let stats = engine.cache_stats();
    assert_eq!(stats.renders, 1);
    assert_eq!(stats.hits, 15);
}

#[tokio::test]
async fn test_render_async_reports_errors() {
    let tree = wide_tree(1);
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let err = engine.render_async(TemplateId::new("shared/footer")).await.unwrap_err();
    assert!(err.to_string().contains("not a root"), "{err}");
}

#[tokio::test]
async fn test_rebuild_while_rendering_keeps_snapshots_consistent() {
    let tree = wide_tree(6);
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let before = engine.graph();
    let renders = engine.render_all();
    let rebuild = {
        let engine = engine.clone();
        tokio::task::spawn_blocking(move || engine.rebuild())
    };
    let (results, rebuilt) = tokio::join!(renders, rebuild);

    rebuilt.unwrap().unwrap();
    assert!(results.iter().all(|(_, result)| result.is_ok()));
    assert_eq!(*before, *engine.graph());
    assert_eq!(before.roots().len(), 6);
}
