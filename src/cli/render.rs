//! Render root documents.
//!
//! ```bash
//! stencil render invoice
//! stencil render --all --out build/previews
//! ```
//!
//! Each rendered root is reported with its artifact handle, size, digest
//! and scratch path. Roots are rendered concurrently; failures of one root
//! do not stop the others, but make the command exit non-zero.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{ArtifactKind, RenderedArtifact};
use crate::core::{StencilError, TemplateId};
use crate::engine::TemplateEngine;
use crate::utils::fs::{atomic_write, ensure_dir};

use super::ProjectContext;

/// Command rendering one or more roots.
#[derive(Args, Debug)]
pub struct RenderCommand {
    /// Roots to render (names or template file paths)
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    templates: Vec<String>,

    /// Render every root of the include graph
    #[arg(long)]
    all: bool,

    /// Copy every rendered document into this directory
    #[arg(short, long)]
    out: Option<PathBuf>,
}

impl RenderCommand {
    pub async fn execute(self, project: &ProjectContext) -> Result<()> {
        let engine = project.scanned_engine()?;

        let results = if self.all {
            engine.render_all().await
        } else {
            let roots = self
                .templates
                .iter()
                .map(|arg| project.template_arg(arg))
                .collect::<Result<Vec<TemplateId>>>()?;
            for root in &roots {
                if !engine.graph().contains(root) {
                    return Err(project.unknown_template(root));
                }
            }
            let renders = roots.into_iter().map(|root| async move {
                let result = engine.render_async(root.clone()).await;
                (root, result)
            });
            join_all(renders).await
        };

        if results.is_empty() {
            println!("{}", "No roots to render".yellow());
            return Ok(());
        }

        if let Some(out) = &self.out {
            ensure_dir(out)?;
        }

        let mut failed = 0;
        for (root, result) in &results {
            match result {
                Ok(artifact) => {
                    report_artifact(artifact);
                    if let Some(out) = &self.out {
                        let path = copy_to(out, engine, artifact)?;
                        println!("    {} {}", "→".dimmed(), path.display());
                    }
                }
                Err(e) => {
                    failed += 1;
                    report_failure(root, e);
                }
            }
        }

        let rendered = results.len() - failed;
        println!();
        println!(
            "Rendered {} of {} root(s); cache: {} hit(s), {} render(s)",
            rendered,
            results.len(),
            engine.cache_stats().hits,
            engine.cache_stats().renders
        );

        if failed > 0 {
            bail!("{failed} root(s) failed to render");
        }
        Ok(())
    }
}

fn report_artifact(artifact: &RenderedArtifact) {
    let status = match artifact.kind {
        ArtifactKind::Document => "✓".green(),
        ArtifactKind::Diagnostic => "⚠".yellow(),
    };
    println!(
        "{status} {} {} {} bytes, sha256 {}",
        artifact.root.as_str().bold(),
        artifact.handle.to_string().dimmed(),
        artifact.len(),
        &artifact.digest[..12.min(artifact.digest.len())]
    );
    if artifact.kind == ArtifactKind::Diagnostic {
        println!("    {}", "document was empty; produced a diagnostic page instead".yellow());
    }
    if let Some(path) = &artifact.path {
        println!("    {} {}", "scratch".dimmed(), path.display());
    }
}

fn report_failure(root: &TemplateId, error: &StencilError) {
    let context = error.to_context();
    println!("{} {} {}", "✗".red(), root.as_str().bold(), context.message);
    if let Some(suggestion) = &context.suggestion {
        println!("    {} {suggestion}", "suggestion:".green());
    }
}

fn copy_to(out: &Path, engine: &TemplateEngine, artifact: &Arc<RenderedArtifact>) -> Result<PathBuf> {
    let file_name = format!(
        "{}.{}",
        artifact.root.as_str().replace('/', "_"),
        engine.document_extension()
    );
    let path = out.join(file_name);
    atomic_write(&path, &artifact.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
