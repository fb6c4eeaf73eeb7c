//! Template loaders.
//!
//! Compilers pull template text through a [`TemplateLoader`]. The engine wraps
//! the real loader in a [`GuardedLoader`] so that every backend gets the same
//! recursion protection, and the graph scanner uses a [`RecordingLoader`] to
//! discover includes by compiling against empty placeholders.

use std::collections::{BTreeSet, HashMap};

use crate::core::TemplateId;
use crate::source::{TemplateLayout, TemplateSource};

use super::error::TemplateError;
use super::guard::RecursionGuard;

/// Resolves template names to source text during compilation.
pub trait TemplateLoader {
    /// Source text of `name`, or `None` when no such template exists.
    fn load(&mut self, name: &TemplateId) -> Result<Option<String>, TemplateError>;
}

/// Loads templates from a [`TemplateSource`] using a [`TemplateLayout`].
pub struct SourceLoader<'a> {
    source: &'a dyn TemplateSource,
    layout: &'a TemplateLayout,
}

impl<'a> SourceLoader<'a> {
    /// Create a loader over `source`.
    pub fn new(source: &'a dyn TemplateSource, layout: &'a TemplateLayout) -> Self {
        Self {
            source,
            layout,
        }
    }
}

impl TemplateLoader for SourceLoader<'_> {
    fn load(&mut self, name: &TemplateId) -> Result<Option<String>, TemplateError> {
        if !self.layout.exists(self.source, name) {
            tracing::debug!(template = %name, "Template not found in source");
            return Ok(None);
        }

        let path = self.layout.path_for_id(name);
        self.source.read_text(&path).map(Some).map_err(|e| TemplateError::Load {
            name: name.clone(),
            message: format!("{e:#}"),
        })
    }
}

/// Wraps a loader with a [`RecursionGuard`].
///
/// Every request is counted before it reaches the inner loader; the request
/// that trips the guard is refused.
pub struct GuardedLoader<'a> {
    inner: &'a mut dyn TemplateLoader,
    guard: RecursionGuard,
}

impl<'a> GuardedLoader<'a> {
    /// Guard `inner` with the given consecutive-request threshold.
    pub fn new(inner: &'a mut dyn TemplateLoader, threshold: usize) -> Self {
        Self {
            inner,
            guard: RecursionGuard::new(threshold),
        }
    }

    /// The guard state, for diagnostics.
    #[must_use]
    pub fn guard(&self) -> &RecursionGuard {
        &self.guard
    }
}

impl TemplateLoader for GuardedLoader<'_> {
    fn load(&mut self, name: &TemplateId) -> Result<Option<String>, TemplateError> {
        self.guard.record(name)?;
        self.inner.load(name)
    }
}

/// Loader used for include discovery.
///
/// The first request for the template being probed returns its real text;
/// every other request returns an empty placeholder and is recorded as found
/// or missing according to `exists`.
pub struct RecordingLoader<'a> {
    target: TemplateId,
    target_source: Option<String>,
    exists: Box<dyn Fn(&TemplateId) -> bool + 'a>,
    requested: Vec<TemplateId>,
    missing: BTreeSet<TemplateId>,
}

impl<'a> RecordingLoader<'a> {
    /// Probe `target`, whose text is `source`.
    pub fn new(
        target: TemplateId,
        source: String,
        exists: impl Fn(&TemplateId) -> bool + 'a,
    ) -> Self {
        Self {
            target,
            target_source: Some(source),
            exists: Box::new(exists),
            requested: Vec::new(),
            missing: BTreeSet::new(),
        }
    }

    /// Every include requested by the compiler, in request order, duplicates removed.
    #[must_use]
    pub fn requested(&self) -> &[TemplateId] {
        &self.requested
    }

    /// Requested includes with no backing template.
    #[must_use]
    pub fn missing(&self) -> &BTreeSet<TemplateId> {
        &self.missing
    }

    /// Consume the loader, returning the requested includes.
    #[must_use]
    pub fn into_requested(self) -> Vec<TemplateId> {
        self.requested
    }
}

impl TemplateLoader for RecordingLoader<'_> {
    fn load(&mut self, name: &TemplateId) -> Result<Option<String>, TemplateError> {
        if *name == self.target {
            if let Some(source) = self.target_source.take() {
                return Ok(Some(source));
            }
        }

        if !self.requested.contains(name) {
            if !(self.exists)(name) {
                self.missing.insert(name.clone());
            }
            self.requested.push(name.clone());
        }
        Ok(Some(String::new()))
    }
}

/// In-memory loader, for hosts serving unsaved buffers and for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    templates: HashMap<TemplateId, String>,
    requests: usize,
}

impl MemoryLoader {
    /// Create an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a template.
    pub fn insert(&mut self, name: impl Into<TemplateId>, source: impl Into<String>) -> &mut Self {
        self.templates.insert(name.into(), source.into());
        self
    }

    /// Builder-style [`MemoryLoader::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<TemplateId>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    /// Number of load requests served so far.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&mut self, name: &TemplateId) -> Result<Option<String>, TemplateError> {
        self.requests += 1;
        Ok(self.templates.get(name).cloned())
    }
}
