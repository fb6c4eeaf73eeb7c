//! The template engine: include graph, root resolution, rendering and cache
//! tied together behind one owned, cloneable handle.
//!
//! # Lifecycle
//!
//! 1. Build an engine with [`TemplateEngine::builder`] or [`TemplateEngine::from_config`].
//! 2. Call [`TemplateEngine::rebuild`] to scan the template tree. Call it again
//!    (or [`TemplateEngine::template_changed`]) whenever files change.
//! 3. Call [`TemplateEngine::render`] for a root. Fresh artifacts come from
//!    the cache; changes invalidate exactly the roots that reach the changed
//!    template.
//!
//! # Concurrency
//!
//! Rebuilds are serialized by a dedicated lock and publish the new graph by
//! swapping an `Arc` under a `RwLock`, so readers holding the previous graph
//! stay valid. Renders of the same root are serialized by the cache; renders
//! of different roots run in parallel ([`TemplateEngine::render_all`]).
//!
//! # Example
//!
//! ```rust,no_run
//! use stencil_cli::core::TemplateId;
//! use stencil_cli::engine::TemplateEngine;
//!
//! # fn example() -> Result<(), stencil_cli::core::StencilError> {
//! let engine = TemplateEngine::builder("src/main/resources/templates").build()?;
//! engine.rebuild()?;
//!
//! let artifact = engine.render(&TemplateId::new("invoice"))?;
//! println!("{} bytes, {} outline nodes", artifact.len(), artifact.outline.node_count());
//! # Ok(())
//! # }
//! ```

use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use crate::cache::{
    ArtifactCache, ArtifactHandle, ArtifactKind, CacheStats, RenderedArtifact, ScratchStore,
};
use crate::config::StencilConfig;
use crate::constants::{DEFAULT_MAX_INCLUDE_DEPTH, DEFAULT_RECURSION_THRESHOLD, DEFAULT_TEMPLATE_SUFFIX};
use crate::core::{StencilError, TemplateId};
use crate::outline::OutlineTree;
use crate::render::{
    DiagnosticRenderer, DiagnosticReport, DocumentRenderer, HtmlDocumentRenderer,
};
use crate::resolver::{ExtractionMode, IncludeGraph, ProbingExtractor, TextualExtractor};
use crate::source::{FsTemplateSource, TemplateLayout, TemplateSource};
use crate::templating::{GuardedLoader, MustacheCompiler, SourceLoader, TemplateCompiler};

#[derive(Debug, Default)]
struct GraphState {
    current: Arc<IncludeGraph>,
    previous: Arc<IncludeGraph>,
}

struct EngineInner {
    source: Arc<dyn TemplateSource>,
    layout: TemplateLayout,
    compiler: Arc<dyn TemplateCompiler>,
    renderer: Arc<dyn DocumentRenderer>,
    diagnostics: DiagnosticRenderer,
    cache: ArtifactCache,
    scratch: Option<ScratchStore>,
    data: Value,
    extraction: ExtractionMode,
    recursion_threshold: usize,
    graphs: RwLock<GraphState>,
    rebuild_lock: Mutex<()>,
}

/// Owned engine instance; clones share state.
#[derive(Clone)]
pub struct TemplateEngine {
    inner: Arc<EngineInner>,
}

/// Builder for [`TemplateEngine`].
pub struct TemplateEngineBuilder {
    templates_dir: PathBuf,
    suffix: String,
    source: Option<Arc<dyn TemplateSource>>,
    compiler: Option<Arc<dyn TemplateCompiler>>,
    renderer: Arc<dyn DocumentRenderer>,
    scratch_dir: Option<PathBuf>,
    data: Value,
    extraction: ExtractionMode,
    recursion_threshold: usize,
    max_include_depth: usize,
    mock_vars: bool,
}

impl TemplateEngineBuilder {
    fn new(templates_dir: PathBuf) -> Self {
        Self {
            templates_dir,
            suffix: DEFAULT_TEMPLATE_SUFFIX.to_string(),
            source: None,
            compiler: None,
            renderer: Arc::new(HtmlDocumentRenderer),
            scratch_dir: None,
            data: Value::Object(serde_json::Map::new()),
            extraction: ExtractionMode::default(),
            recursion_threshold: DEFAULT_RECURSION_THRESHOLD,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            mock_vars: false,
        }
    }

    /// Template file suffix (default `mustache`).
    #[must_use]
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Replace the file-system source (its root should match the templates directory).
    #[must_use]
    pub fn source(mut self, source: Arc<dyn TemplateSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Replace the built-in Mustache compiler.
    ///
    /// `max_include_depth` and `mock_vars` only configure the built-in compiler.
    #[must_use]
    pub fn compiler(mut self, compiler: Arc<dyn TemplateCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Replace the HTML pass-through document renderer.
    #[must_use]
    pub fn document_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Persist artifacts under `dir`.
    #[must_use]
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Data model every root is rendered against.
    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Include extraction strategy.
    #[must_use]
    pub fn extraction(mut self, mode: ExtractionMode) -> Self {
        self.extraction = mode;
        self
    }

    /// Consecutive identical loader requests tolerated per compilation.
    #[must_use]
    pub fn recursion_threshold(mut self, threshold: usize) -> Self {
        self.recursion_threshold = threshold;
        self
    }

    /// Maximum include nesting depth of the built-in compiler.
    #[must_use]
    pub fn max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Render missing variables as mock values.
    #[must_use]
    pub fn mock_vars(mut self, mock_vars: bool) -> Self {
        self.mock_vars = mock_vars;
        self
    }

    /// Build the engine. The include graph starts empty until [`TemplateEngine::rebuild`].
    pub fn build(self) -> Result<TemplateEngine, StencilError> {
        let layout = TemplateLayout::new(&self.templates_dir, &self.suffix);
        let source: Arc<dyn TemplateSource> = match self.source {
            Some(source) => source,
            None => Arc::new(FsTemplateSource::new(&self.templates_dir)),
        };
        let compiler: Arc<dyn TemplateCompiler> = match self.compiler {
            Some(compiler) => compiler,
            None => Arc::new(
                MustacheCompiler::new()
                    .with_max_include_depth(self.max_include_depth)
                    .with_mock_vars(self.mock_vars),
            ),
        };
        let scratch =
            self.scratch_dir.map(|dir| ScratchStore::new(dir, self.renderer.extension()));

        Ok(TemplateEngine {
            inner: Arc::new(EngineInner {
                source,
                layout,
                compiler,
                renderer: self.renderer,
                diagnostics: DiagnosticRenderer::new()?,
                cache: ArtifactCache::new(),
                scratch,
                data: self.data,
                extraction: self.extraction,
                recursion_threshold: self.recursion_threshold,
                graphs: RwLock::new(GraphState::default()),
                rebuild_lock: Mutex::new(()),
            }),
        })
    }
}

impl TemplateEngine {
    /// Start building an engine for `templates_dir`.
    pub fn builder(templates_dir: impl Into<PathBuf>) -> TemplateEngineBuilder {
        TemplateEngineBuilder::new(templates_dir.into())
    }

    /// Build an engine from project configuration, loading its data model.
    pub fn from_config(config: &StencilConfig) -> Result<Self, StencilError> {
        let mut builder = Self::builder(config.templates_path())
            .suffix(config.suffix.clone())
            .data(config.load_data()?)
            .extraction(config.extraction)
            .recursion_threshold(config.recursion_threshold)
            .max_include_depth(config.max_include_depth)
            .mock_vars(config.mock_vars);
        if let Some(scratch) = config.scratch_path() {
            builder = builder.scratch_dir(scratch);
        }
        builder.build()
    }

    /// Template root directory.
    #[must_use]
    pub fn templates_dir(&self) -> &Path {
        self.inner.layout.root()
    }

    /// Path/identifier mapping in use.
    #[must_use]
    pub fn layout(&self) -> &TemplateLayout {
        &self.inner.layout
    }

    /// File extension of rendered documents.
    #[must_use]
    pub fn document_extension(&self) -> &str {
        self.inner.renderer.extension()
    }

    /// Scratch store, when artifacts are persisted.
    #[must_use]
    pub fn scratch(&self) -> Option<&ScratchStore> {
        self.inner.scratch.as_ref()
    }

    fn read_graphs(&self) -> std::sync::RwLockReadGuard<'_, GraphState> {
        self.inner.graphs.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current include graph snapshot.
    #[must_use]
    pub fn graph(&self) -> Arc<IncludeGraph> {
        Arc::clone(&self.read_graphs().current)
    }

    /// Snapshot before the last rebuild.
    #[must_use]
    pub fn previous_graph(&self) -> Arc<IncludeGraph> {
        Arc::clone(&self.read_graphs().previous)
    }

    /// Rescan the template tree and publish a new include graph.
    ///
    /// Cached artifacts of roots that no longer exist are evicted (and their
    /// scratch files removed); all other entries are left as they are.
    ///
    /// # Errors
    ///
    /// [`StencilError::TemplatesDirNotFound`] when the template root is
    /// missing. The current graph stays published in that case.
    pub fn rebuild(&self) -> Result<(), StencilError> {
        let _rebuilding = self.inner.rebuild_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let started = Instant::now();

        let inner = &*self.inner;
        let graph = match inner.extraction {
            ExtractionMode::Textual => {
                IncludeGraph::build(&*inner.source, &inner.layout, &TextualExtractor)?
            }
            ExtractionMode::Probing => {
                let extractor =
                    ProbingExtractor::new(&*inner.compiler, &*inner.source, &inner.layout);
                IncludeGraph::build(&*inner.source, &inner.layout, &extractor)?
            }
        };
        let graph = Arc::new(graph);

        let removed = {
            let mut state = inner.graphs.write().unwrap_or_else(PoisonError::into_inner);
            state.previous = std::mem::replace(&mut state.current, Arc::clone(&graph));
            graph.removed_roots(&state.previous)
        };

        for artifact in inner.cache.evict(&removed) {
            if let Some(scratch) = &inner.scratch {
                if let Err(e) = scratch.remove(&artifact.root) {
                    tracing::warn!(root = %artifact.root, error = %e, "Failed to remove scratch artifact");
                }
            }
        }

        tracing::info!(
            templates = graph.files().len(),
            roots = graph.roots().len(),
            removed_roots = removed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rebuilt include graph"
        );
        Ok(())
    }

    /// Roots reaching `id` in the current graph; empty when unknown.
    #[must_use]
    pub fn roots_for(&self, id: &TemplateId) -> BTreeSet<TemplateId> {
        self.read_graphs().current.roots_for(id)
    }

    /// Roots reaching `id` in the graph before the last rebuild.
    #[must_use]
    pub fn old_roots_for(&self, id: &TemplateId) -> BTreeSet<TemplateId> {
        self.read_graphs().previous.roots_for(id)
    }

    /// Identifier of a template file, `None` for files outside the root or with another suffix.
    #[must_use]
    pub fn template_id_for_path(&self, path: &Path) -> Option<TemplateId> {
        self.inner.layout.id_for_path(path)
    }

    /// File-change hook: rebuild, then invalidate the old and new roots of every changed template.
    ///
    /// Covers edits, creations and deletions. Returns the invalidated roots.
    pub fn template_changed(&self, paths: &[PathBuf]) -> Result<BTreeSet<TemplateId>, StencilError> {
        let ids: Vec<TemplateId> =
            paths.iter().filter_map(|path| self.template_id_for_path(path)).collect();
        if ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        self.rebuild()?;

        let mut affected = BTreeSet::new();
        for id in &ids {
            affected.extend(self.old_roots_for(id));
            affected.extend(self.roots_for(id));
        }
        self.invalidate(&affected);
        tracing::debug!(changed = ids.len(), roots = affected.len(), "Templates changed");
        Ok(affected)
    }

    /// Move/rename hook: rebuild, then invalidate the old roots of `from` and the new roots of `to`.
    pub fn template_moved(&self, from: &Path, to: &Path) -> Result<BTreeSet<TemplateId>, StencilError> {
        self.rebuild()?;

        let mut affected = BTreeSet::new();
        if let Some(id) = self.template_id_for_path(from) {
            affected.extend(self.old_roots_for(&id));
        }
        if let Some(id) = self.template_id_for_path(to) {
            affected.extend(self.roots_for(&id));
        }
        self.invalidate(&affected);
        Ok(affected)
    }

    /// Mark the cached artifacts of `roots` expired. Unknown roots are ignored.
    pub fn invalidate<'a>(&self, roots: impl IntoIterator<Item = &'a TemplateId>) -> usize {
        self.inner.cache.invalidate(roots)
    }

    /// Mark every cached artifact expired.
    pub fn invalidate_all(&self) -> usize {
        self.inner.cache.invalidate_all()
    }

    /// Render `root`, serving a fresh cached artifact when there is one.
    ///
    /// # Errors
    ///
    /// - [`StencilError::TemplateNotFound`] for unknown templates
    /// - [`StencilError::NotARoot`] for templates included by others that have roots;
    ///   templates only reachable through an include cycle render as their own root
    /// - [`StencilError::Template`] for recursion and syntax failures
    /// - [`StencilError::EmptyArtifact`] when even the diagnostic page is empty
    pub fn render(&self, root: &TemplateId) -> Result<Arc<RenderedArtifact>, StencilError> {
        {
            let graphs = self.read_graphs();
            let graph = &graphs.current;
            if !graph.roots().contains(root) {
                if !graph.is_file(root) {
                    return Err(StencilError::TemplateNotFound {
                        name: root.clone(),
                    });
                }
                let roots = graph.roots_for(root);
                if !roots.is_empty() {
                    return Err(StencilError::NotARoot {
                        name: root.clone(),
                        roots: roots.into_iter().collect(),
                    });
                }
                // Self-includes and pure cycles have no root; they render as their own
                tracing::debug!(template = %root, "Rendering template without a root as its own root");
            }
        }

        self.inner.cache.get_or_render(root, |handle| {
            self.render_uncached(root, handle).inspect_err(|e| {
                tracing::warn!(root = %root, error = %e, "Render failed");
            })
        })
    }

    /// Render every root reaching `id` (the template itself when it is a root or has none).
    pub fn render_roots_of(
        &self,
        id: &TemplateId,
    ) -> Vec<(TemplateId, Result<Arc<RenderedArtifact>, StencilError>)> {
        let mut roots = self.roots_for(id);
        if roots.is_empty() && self.graph().is_file(id) {
            roots.insert(id.clone());
        }
        roots
            .into_iter()
            .map(|root| {
                let result = self.render(&root);
                (root, result)
            })
            .collect()
    }

    fn render_uncached(
        &self,
        root: &TemplateId,
        handle: ArtifactHandle,
    ) -> Result<RenderedArtifact, StencilError> {
        let inner = &*self.inner;
        let started = Instant::now();

        let mut source_loader = SourceLoader::new(&*inner.source, &inner.layout);
        let mut loader = GuardedLoader::new(&mut source_loader, inner.recursion_threshold);
        let compiled = inner.compiler.compile(root, &mut loader)?;

        let html = compiled.execute(&inner.data)?;
        let outline = OutlineTree::extract(root, &compiled.segments(), &|id| {
            inner.layout.exists(&*inner.source, id)
        });

        let bytes = inner.renderer.render_document(&html).map_err(|e| {
            StencilError::DocumentRender {
                root: root.clone(),
                message: format!("{e:#}"),
            }
        })?;

        if bytes.is_empty() {
            tracing::warn!(root = %root, "Rendered document is empty, producing diagnostic page");
            return self.diagnostic_artifact(root, handle, outline);
        }

        let path = match &inner.scratch {
            Some(scratch) => match scratch.write(root, &bytes) {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!(root = %root, error = %format!("{e:#}"), "Could not persist artifact");
                    None
                }
            },
            None => None,
        };

        tracing::debug!(
            root = %root,
            bytes = bytes.len(),
            outline_nodes = outline.node_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rendered root"
        );
        Ok(RenderedArtifact::new(root.clone(), handle, ArtifactKind::Document, bytes, outline)
            .with_path(path))
    }

    fn diagnostic_artifact(
        &self,
        root: &TemplateId,
        handle: ArtifactHandle,
        outline: OutlineTree,
    ) -> Result<RenderedArtifact, StencilError> {
        let mut report = DiagnosticReport::new(root.clone(), "The generated document is empty")
            .with_detail(format!("Outline nodes: {}", outline.node_count()));
        for include in outline.invalid_includes() {
            report = report.with_detail(format!(
                "Missing include '{}' in '{}' at line {}",
                include.normalized_name(),
                include.parent_fragment,
                include.source_line
            ));
        }

        let html = self.inner.diagnostics.render(&report)?;
        let bytes = self.inner.renderer.render_document(&html).map_err(|e| {
            StencilError::DocumentRender {
                root: root.clone(),
                message: format!("{e:#}"),
            }
        })?;
        if bytes.is_empty() {
            return Err(StencilError::EmptyArtifact {
                root: root.clone(),
            });
        }

        Ok(RenderedArtifact::new(root.clone(), handle, ArtifactKind::Diagnostic, bytes, outline))
    }

    /// [`TemplateEngine::render`] on the blocking thread pool.
    pub async fn render_async(
        &self,
        root: TemplateId,
    ) -> Result<Arc<RenderedArtifact>, StencilError> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.render(&root))
            .await
            .map_err(|e| StencilError::Other(anyhow::Error::new(e).context("Render task failed")))?
    }

    /// Render every root of the current graph concurrently.
    pub async fn render_all(&self) -> Vec<(TemplateId, Result<Arc<RenderedArtifact>, StencilError>)> {
        let roots: Vec<TemplateId> = self.graph().roots().iter().cloned().collect();
        let renders = roots.into_iter().map(|root| async move {
            let result = self.render_async(root.clone()).await;
            (root, result)
        });
        join_all(renders).await
    }

    /// Outline of `root`, rendering it first when needed.
    pub fn outline(&self, root: &TemplateId) -> Result<OutlineTree, StencilError> {
        Ok(self.render(root)?.outline.clone())
    }

    /// Root that produced the artifact with `handle`.
    #[must_use]
    pub fn root_for_artifact(&self, handle: ArtifactHandle) -> Option<TemplateId> {
        self.inner.cache.root_for_artifact(handle)
    }

    /// Root owning the scratch artifact at `path`.
    #[must_use]
    pub fn root_for_artifact_path(&self, path: &Path) -> Option<TemplateId> {
        if let Some(root) = self.inner.cache.root_for_artifact_path(path) {
            return Some(root);
        }

        let scratch = self.inner.scratch.as_ref()?;
        self.graph().roots().iter().find(|root| scratch.path_for(root) == path).cloned()
    }

    /// Delete every scratch artifact; returns how many were removed.
    pub fn purge_scratch(&self) -> Result<usize, StencilError> {
        match &self.inner.scratch {
            Some(scratch) => Ok(scratch.purge()?),
            None => Ok(0),
        }
    }

    /// Cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Whether `root` has a cached artifact, and whether it is expired.
    #[must_use]
    pub fn cache_state(&self, root: &TemplateId) -> Option<bool> {
        self.inner.cache.is_expired(root)
    }
}
