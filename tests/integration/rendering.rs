//! Rendering roots against a data model, preview markers and the diagnostic fallback.

use serde_json::json;
use std::sync::Arc;

use stencil_cli::cache::ArtifactKind;
use stencil_cli::core::{StencilError, TemplateId};
use stencil_cli::engine::TemplateEngine;
use stencil_cli::render::DocumentRenderer;
use stencil_cli::templating::{faulty_partial_marker, faulty_var_marker};
use stencil_cli::test_utils::TemplateTree;

fn render_text(engine: &TemplateEngine, root: &str) -> String {
    let artifact = engine.render(&TemplateId::new(root)).unwrap();
    String::from_utf8(artifact.bytes.clone()).unwrap()
}

fn invoice_tree() -> TemplateTree {
    TemplateTree::new()
        .with(
            "invoice",
            "<h1>{{customer.name}}</h1>\n{{#items}}<li>{{name}}: {{price}}</li>{{/items}}\n{{^items}}empty{{/items}}\n{{> mail/footer}}",
        )
        .with("mail/footer", "<p>{{company}} / {{phone}}</p>")
}

#[test]
fn test_render_against_data_model() {
    let tree = invoice_tree();
    let engine = tree
        .builder()
        .data(json!({
            "customer": {"name": "Ada & Co"},
            "items": [{"name": "Tea", "price": 3}, {"name": "Cake", "price": null}],
            "company": "ACME",
            "phone": "555"
        }))
        .build()
        .unwrap();
    engine.rebuild().unwrap();

    assert_eq!(
        render_text(&engine, "invoice"),
        "<h1>Ada &amp; Co</h1>\n<li>Tea: 3</li><li>Cake: -</li>\n\n<p>ACME / 555</p>"
    );
}

#[test]
fn test_missing_data_renders_preview_markers() {
    let tree = invoice_tree();
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let html = render_text(&engine, "invoice");
    assert!(html.contains(&faulty_var_marker("customer.name")));
    // Sections over absent names render their body once; inverted ones nothing
    assert!(html.contains(&format!("<li>{}: {}</li>", faulty_var_marker("name"), faulty_var_marker("price"))));
    assert!(!html.contains("empty"));
    assert!(html.contains(&faulty_var_marker("company")));
}

#[test]
fn test_mock_vars_replace_markers() {
    let tree = TemplateTree::new().with("letter", "Dear {{name}},");
    let engine = tree.builder().mock_vars(true).build().unwrap();
    engine.rebuild().unwrap();

    let html = render_text(&engine, "letter");
    assert!(html.starts_with("Dear name["), "{html}");
    assert!(html.ends_with("],"));
    assert_eq!(html.len(), "Dear name[xxxxx],".len());
    assert!(!html.contains("FAULTY_VAR"));
}

#[test]
fn test_unknown_and_partial_roots_are_rejected() {
    let tree = invoice_tree();
    let engine = tree.engine();
    engine.rebuild().unwrap();

    assert!(matches!(
        engine.render(&TemplateId::new("nope")),
        Err(StencilError::TemplateNotFound { .. })
    ));
    match engine.render(&TemplateId::new("mail/footer")) {
        Err(StencilError::NotARoot { name, roots }) => {
            assert_eq!(name, TemplateId::new("mail/footer"));
            assert_eq!(roots, vec![TemplateId::new("invoice")]);
        }
        other => panic!("expected NotARoot, got {other:?}"),
    }

    let results = engine.render_roots_of(&TemplateId::new("mail/footer"));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, TemplateId::new("invoice"));
    assert!(results[0].1.is_ok());
}

#[test]
fn test_syntax_error_is_scoped_to_its_root() {
    let tree = TemplateTree::new().with("broken", "{{#open}}never closed").with("fine", "ok");
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let err = engine.render(&TemplateId::new("broken")).unwrap_err();
    assert!(matches!(err, StencilError::Template(_)), "{err}");
    assert_eq!(engine.cache_state(&TemplateId::new("broken")), None);
    assert_eq!(render_text(&engine, "fine"), "ok");
}

#[test]
fn test_empty_document_produces_uncached_diagnostic() {
    let tree = TemplateTree::new().with("blank", "{{#flags}}{{/flags}}").with("other", "x");
    let engine = tree.builder().data(json!({"flags": false})).build().unwrap();
    engine.rebuild().unwrap();

    let artifact = engine.render(&TemplateId::new("blank")).unwrap();
    assert_eq!(artifact.kind, ArtifactKind::Diagnostic);
    let html = String::from_utf8_lossy(&artifact.bytes);
    assert!(html.contains("blank"));
    assert!(html.contains("The generated document is empty"));

    assert_eq!(engine.cache_state(&TemplateId::new("blank")), None);
    assert_eq!(engine.root_for_artifact(artifact.handle), Some(TemplateId::new("blank")));
    assert_eq!(render_text(&engine, "other"), "x");
}

/// Renderer that produces nothing, whatever the input.
struct NullRenderer;

impl DocumentRenderer for NullRenderer {
    fn render_document(&self, _html: &str) -> anyhow::Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn extension(&self) -> &str {
        "pdf"
    }
}

#[test]
fn test_empty_diagnostic_is_an_error() {
    let tree = TemplateTree::new().with("doc", "content");
    let engine = tree.builder().document_renderer(Arc::new(NullRenderer)).build().unwrap();
    engine.rebuild().unwrap();

    let err = engine.render(&TemplateId::new("doc")).unwrap_err();
    assert!(matches!(err, StencilError::EmptyArtifact { .. }), "{err}");
    assert_eq!(engine.document_extension(), "pdf");
}

/// Renderer that fails.
struct FailingRenderer;

impl DocumentRenderer for FailingRenderer {
    fn render_document(&self, _html: &str) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("printer on fire")
    }

    fn extension(&self) -> &str {
        "pdf"
    }
}

#[test]
fn test_document_renderer_failure_is_reported() {
    let tree = TemplateTree::new().with("doc", "content");
    let engine = tree.builder().document_renderer(Arc::new(FailingRenderer)).build().unwrap();
    engine.rebuild().unwrap();

    match engine.render(&TemplateId::new("doc")) {
        Err(StencilError::DocumentRender { root, message }) => {
            assert_eq!(root, TemplateId::new("doc"));
            assert!(message.contains("printer on fire"));
        }
        other => panic!("expected DocumentRender, got {other:?}"),
    }
}

#[test]
fn test_artifact_metadata() {
    let tree = TemplateTree::new().with("doc", "hello");
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let artifact = engine.render(&TemplateId::new("doc")).unwrap();
    assert_eq!(artifact.kind, ArtifactKind::Document);
    assert_eq!(artifact.len(), 5);
    assert_eq!(
        artifact.digest,
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(artifact.path, None);
}

#[test]
fn test_includes_above_root_are_not_loaded() {
    let tree = TemplateTree::new().with("page", "[{{>../secret}}]");
    std::fs::write(tree.base().join("secret.mustache"), "OUTSIDE-ROOT").unwrap();
    let engine = tree.engine();
    engine.rebuild().unwrap();

    let html = render_text(&engine, "page");
    assert!(!html.contains("OUTSIDE-ROOT"), "{html}");
    assert_eq!(html, format!("[{}]", faulty_partial_marker("../secret")));

    let outline = engine.outline(&TemplateId::new("page")).unwrap();
    let invalid = outline.invalid_includes();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].normalized_name(), "../secret");
}
