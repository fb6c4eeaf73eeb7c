//! Per-root artifact cache.
//!
//! Every rendered root is kept as a [`RenderedArtifact`] together with an
//! `expired` flag. Lookups of a fresh entry are pure cache hits; missing or
//! expired entries are rendered again through the caller-supplied closure.
//!
//! # Concurrency
//!
//! Entries live in a [`DashMap`], so lookups from many threads never block
//! each other. Rendering is serialized per root by a compute-once lock: the
//! first caller renders while later callers for the same root wait on the
//! lock and then find the fresh entry (double-checked after locking). Renders
//! of different roots run in parallel.
//!
//! # Failure handling
//!
//! A failed render leaves the previous entry (if any) in place and expired,
//! so the next request retries. Diagnostic artifacts (the empty-document
//! fallback) are returned but never stored.

pub mod scratch;

pub use scratch::ScratchStore;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::{StencilError, TemplateId};
use crate::outline::OutlineTree;
use crate::utils::sha256_hex;

/// Opaque identifier of a produced artifact, usable for reverse lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArtifactHandle(u64);

impl ArtifactHandle {
    /// Raw numeric value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a rendered artifact contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// The rendered document.
    Document,
    /// The fallback document describing why rendering produced nothing.
    Diagnostic,
}

/// A rendered root: document bytes plus its outline.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedArtifact {
    /// Root template the artifact was rendered from.
    pub root: TemplateId,
    /// Handle for reverse lookups.
    pub handle: ArtifactHandle,
    /// Document or diagnostic.
    pub kind: ArtifactKind,
    /// Document bytes.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of `bytes`.
    pub digest: String,
    /// Outline of the compiled root.
    pub outline: OutlineTree,
    /// Scratch file the bytes were written to, if any.
    pub path: Option<PathBuf>,
    /// Render time.
    pub rendered_at: DateTime<Utc>,
}

impl RenderedArtifact {
    /// Assemble an artifact, computing its digest.
    #[must_use]
    pub fn new(
        root: TemplateId,
        handle: ArtifactHandle,
        kind: ArtifactKind,
        bytes: Vec<u8>,
        outline: OutlineTree,
    ) -> Self {
        Self {
            digest: sha256_hex(&bytes),
            root,
            handle,
            kind,
            bytes,
            outline,
            path: None,
            rendered_at: Utc::now(),
        }
    }

    /// Record the scratch file backing this artifact.
    #[must_use]
    pub fn with_path(mut self, path: Option<PathBuf>) -> Self {
        self.path = path;
        self
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the artifact has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Requests served from a fresh entry
    pub hits: usize,
    /// Requests that needed a render
    pub misses: usize,
    /// Render closures invoked (successful or not)
    pub renders: usize,
    /// Entries currently stored
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate as a percentage.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    artifact: Arc<RenderedArtifact>,
    expired: bool,
}

/// Per-root cache of rendered artifacts.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    entries: DashMap<TemplateId, CacheEntry>,
    /// Per-root locks that make a render happen at most once at a time
    render_locks: DashMap<TemplateId, Arc<Mutex<()>>>,
    /// Live handles, for reverse lookups
    handles: DashMap<ArtifactHandle, TemplateId>,
    /// Latest handle of each root; older handles are retired when it changes
    latest_handles: DashMap<TemplateId, ArtifactHandle>,
    next_handle: AtomicU64,
    hits: AtomicUsize,
    misses: AtomicUsize,
    renders: AtomicUsize,
}

impl ArtifactCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(&self, root: &TemplateId) -> Option<Arc<RenderedArtifact>> {
        self.entries.get(root).filter(|entry| !entry.expired).map(|entry| Arc::clone(&entry.artifact))
    }

    fn allocate_handle(&self) -> ArtifactHandle {
        ArtifactHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Return the fresh artifact of `root`, rendering it with `render` when
    /// it is missing or expired.
    ///
    /// `render` receives the handle the new artifact must carry.
    ///
    /// # Errors
    ///
    /// Whatever `render` returns; the cache is left untouched in that case.
    pub fn get_or_render<F>(
        &self,
        root: &TemplateId,
        render: F,
    ) -> Result<Arc<RenderedArtifact>, StencilError>
    where
        F: FnOnce(ArtifactHandle) -> Result<RenderedArtifact, StencilError>,
    {
        if let Some(artifact) = self.fresh(root) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(root = %root, "Artifact cache hit");
            return Ok(artifact);
        }

        let lock = self
            .render_locks
            .entry(root.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Another caller may have rendered while we waited
        if let Some(artifact) = self.fresh(root) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(root = %root, "Artifact cache hit after waiting for render");
            return Ok(artifact);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        self.renders.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(root = %root, "Artifact cache miss, rendering");

        let handle = self.allocate_handle();
        let artifact = Arc::new(render(handle)?);
        self.handles.insert(handle, root.clone());
        if let Some(previous) = self.latest_handles.insert(root.clone(), handle) {
            self.handles.remove(&previous);
        }

        if artifact.kind == ArtifactKind::Document {
            self.entries.insert(
                root.clone(),
                CacheEntry {
                    artifact: Arc::clone(&artifact),
                    expired: false,
                },
            );
        }

        Ok(artifact)
    }

    /// The stored artifact of `root`, fresh or expired.
    #[must_use]
    pub fn get(&self, root: &TemplateId) -> Option<Arc<RenderedArtifact>> {
        self.entries.get(root).map(|entry| Arc::clone(&entry.artifact))
    }

    /// `Some(expired)` for stored roots, `None` otherwise.
    #[must_use]
    pub fn is_expired(&self, root: &TemplateId) -> Option<bool> {
        self.entries.get(root).map(|entry| entry.expired)
    }

    /// Mark the entries of `roots` expired; unknown roots are ignored.
    ///
    /// Returns the number of entries marked.
    pub fn invalidate<'a>(&self, roots: impl IntoIterator<Item = &'a TemplateId>) -> usize {
        let mut marked = 0;
        for root in roots {
            if let Some(mut entry) = self.entries.get_mut(root) {
                entry.expired = true;
                marked += 1;
            }
        }
        tracing::debug!(marked, "Invalidated cached artifacts");
        marked
    }

    /// Mark every entry expired.
    pub fn invalidate_all(&self) -> usize {
        let mut marked = 0;
        for mut entry in self.entries.iter_mut() {
            entry.expired = true;
            marked += 1;
        }
        tracing::debug!(marked, "Invalidated all cached artifacts");
        marked
    }

    /// Remove the entries of `roots`, returning the removed artifacts.
    pub fn evict<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a TemplateId>,
    ) -> Vec<Arc<RenderedArtifact>> {
        let roots: BTreeSet<TemplateId> = roots.into_iter().cloned().collect();
        let mut evicted = Vec::new();
        for root in &roots {
            if let Some((_, entry)) = self.entries.remove(root) {
                evicted.push(entry.artifact);
            }
            self.render_locks.remove(root);
            if let Some((_, handle)) = self.latest_handles.remove(root) {
                self.handles.remove(&handle);
            }
        }

        if !evicted.is_empty() {
            tracing::debug!(count = evicted.len(), "Evicted artifacts of removed roots");
        }
        evicted
    }

    /// Root that produced the artifact with `handle`.
    ///
    /// Only the latest artifact of each root resolves; re-rendering a root
    /// retires the handle of the artifact it replaces.
    #[must_use]
    pub fn root_for_artifact(&self, handle: ArtifactHandle) -> Option<TemplateId> {
        self.handles.get(&handle).map(|root| root.value().clone())
    }

    /// Root whose stored artifact was written to `path`.
    #[must_use]
    pub fn root_for_artifact_path(&self, path: &Path) -> Option<TemplateId> {
        self.entries
            .iter()
            .find(|entry| entry.artifact.path.as_deref() == Some(path))
            .map(|entry| entry.key().clone())
    }

    /// Stored roots, sorted.
    #[must_use]
    pub fn roots(&self) -> BTreeSet<TemplateId> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            renders: self.renders.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
