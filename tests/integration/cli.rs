//! Integration tests for the `stencil` command line.

use assert_cmd::Command;
use predicates::prelude::*;
use stencil_cli::test_utils::TemplateTree;

/// A includes B, B includes C, D includes C, plus a stencil.toml next to the templates.
fn project() -> TemplateTree {
    let tree = TemplateTree::new()
        .with("A", "A[{{>B}}]")
        .with("B", "B[{{>C}}]")
        .with("C", "C {{name}}")
        .with("D", "D[{{>C}}]");
    std::fs::write(
        tree.base().join("stencil.toml"),
        "templates_dir = \"templates\"\nscratch_dir = \"scratch\"\ndata_file = \"data.json\"\n",
    )
    .unwrap();
    std::fs::write(tree.base().join("data.json"), r#"{"name": "Ada"}"#).unwrap();
    tree
}

fn stencil(tree: &TemplateTree) -> Command {
    let mut cmd = Command::cargo_bin("stencil").unwrap();
    cmd.current_dir(tree.base()).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_roots_of_partial() {
    let tree = project();
    stencil(&tree)
        .args(["roots", "C"])
        .assert()
        .success()
        .stdout(predicate::eq("A\nD\n"));
}

#[test]
fn test_roots_accepts_template_path() {
    let tree = project();
    stencil(&tree)
        .args(["roots", "templates/B.mustache", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"A\""))
        .stdout(predicate::str::contains("\"D\"").not());
}

#[test]
fn test_roots_suggests_similar_names() {
    let tree = project().with("mail/footer", "bye");
    stencil(&tree)
        .args(["roots", "mail/foter"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown template 'mail/foter'"))
        .stderr(predicate::str::contains("Did you mean: mail/footer?"));
}

#[test]
fn test_graph_tree() {
    let tree = project();
    stencil(&tree)
        .arg("graph")
        .assert()
        .success()
        .stdout(predicate::str::contains("A\n└── B\n    └── C\n"))
        .stdout(predicate::str::contains("D\n└── C\n"));
}

#[test]
fn test_graph_depth_and_json() {
    let tree = project();
    stencil(&tree)
        .args(["graph", "--depth", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("└── B\n"))
        .stdout(predicate::str::contains("    └── C").not());

    let output = stencil(&tree).args(["graph", "--format", "json"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["roots"], serde_json::json!(["A", "D"]));
    assert_eq!(json["templates"]["C"]["roots"], serde_json::json!(["A", "D"]));
    assert_eq!(json["templates"]["A"]["includes"], serde_json::json!(["B"]));
}

#[test]
fn test_render_all_writes_artifacts() {
    let tree = project();
    let out = tree.base().join("out");
    stencil(&tree)
        .args(["render", "--all", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered 2 of 2 root(s)"));

    assert_eq!(std::fs::read_to_string(out.join("A.html")).unwrap(), "A[B[C Ada]]");
    assert_eq!(std::fs::read_to_string(out.join("D.html")).unwrap(), "D[C Ada]");
    assert!(tree.base().join("scratch").join("A.mtf.html").is_file());
}

#[test]
fn test_render_partial_fails_with_roots_hint() {
    let tree = project();
    stencil(&tree)
        .args(["render", "C"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("is not a root"))
        .stdout(predicate::str::contains("A, D"))
        .stderr(predicate::str::contains("1 root(s) failed to render"));
}

#[test]
fn test_render_requires_targets() {
    let tree = project();
    stencil(&tree).arg("render").assert().failure();
}

#[test]
fn test_outline_json() {
    let tree = TemplateTree::new().with("page", "{{#items}}{{name}}{{/items}}{{>ghost}}");
    let output = Command::cargo_bin("stencil")
        .unwrap()
        .current_dir(tree.base())
        .env("NO_COLOR", "1")
        .args(["--templates-dir", "templates", "outline", "page", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["nodes"][0]["name"], "items");
    assert_eq!(json["nodes"][1]["include_valid"], false);
}

#[test]
fn test_outline_tree_warns_about_missing_includes() {
    let tree = project().with("A", "{{>nowhere}}");
    stencil(&tree)
        .args(["outline", "A"])
        .assert()
        .success()
        .stdout(predicate::str::contains(">/nowhere, line=1 (missing)"))
        .stdout(predicate::str::contains("1 include(s) point at missing templates"));
}

#[test]
fn test_check_clean_tree() {
    let tree = project();
    stencil(&tree)
        .args(["check", "--strict"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No problems found"));
}

#[test]
fn test_check_reports_problems() {
    let tree = project()
        .with("E", "{{>ghost}}")
        .with("P", "{{>Q}}")
        .with("Q", "{{>P}}");

    stencil(&tree)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("missing template 'ghost' included by E"))
        .stdout(predicate::str::contains("include cycle: P → Q → P"))
        .stdout(predicate::str::contains("'P' is not reachable from any root"));

    stencil(&tree)
        .args(["check", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template check failed with 4 problem(s)"));
}

#[test]
fn test_clean_purges_scratch() {
    let tree = project();
    stencil(&tree).args(["render", "A", "D"]).assert().success();

    stencil(&tree)
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 2 artifact(s)"));
    assert!(!tree.base().join("scratch").join("A.mtf.html").exists());
}

#[test]
fn test_missing_templates_dir() {
    let tree = project();
    stencil(&tree)
        .args(["--templates-dir", "nope", "graph"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Templates directory not found"))
        .stderr(predicate::str::contains("templates_dir"));
}

#[test]
fn test_invalid_config() {
    let tree = project();
    std::fs::write(tree.base().join("stencil.toml"), "templates_dir = [").unwrap();
    stencil(&tree)
        .arg("graph")
        .assert()
        .failure()
        .stderr(predicate::str::contains("stencil.toml"));
}
