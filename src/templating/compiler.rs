//! Compiler traits and the built-in Mustache backend.
//!
//! [`TemplateCompiler`] and [`CompiledTemplate`] are the seam between the
//! engine and a concrete template language. [`MustacheCompiler`] implements
//! them for the Mustache subset described in the crate documentation.
//!
//! Includes are resolved while compiling: every `{{>name}}` occurrence asks
//! the loader for `name` and compiles the result into its own fragment. The
//! walk uses an explicit work stack in depth-first pre-order, so loader
//! requests arrive in document order and include depth never turns into
//! native recursion.

use serde_json::Value;

use crate::constants::DEFAULT_MAX_INCLUDE_DEPTH;
use crate::core::TemplateId;

use super::error::TemplateError;
use super::executor::Executor;
use super::loader::TemplateLoader;
use super::parser::{self, Node};
use super::segments::RawSegment;

/// A compiled, executable and introspectable template.
pub trait CompiledTemplate: Send + Sync {
    /// Identifier of the root template.
    fn name(&self) -> &TemplateId;

    /// Render against `data`.
    fn execute(&self, data: &Value) -> Result<String, TemplateError>;

    /// Structural view used by the outline extractor.
    fn segments(&self) -> Vec<RawSegment>;
}

/// Turns template text into [`CompiledTemplate`]s.
pub trait TemplateCompiler: Send + Sync {
    /// Compile `name`, pulling its text and the text of every include from `loader`.
    ///
    /// # Errors
    ///
    /// [`TemplateError::NotFound`] when the loader has no text for `name`,
    /// syntax errors from any loaded template, and whatever the loader
    /// returns (recursion failures included).
    fn compile(
        &self,
        name: &TemplateId,
        loader: &mut dyn TemplateLoader,
    ) -> Result<Box<dyn CompiledTemplate>, TemplateError>;
}

/// One loaded template inside a compiled Mustache tree.
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    pub id: TemplateId,
    pub nodes: Vec<Node>,
    pub includes: Vec<TemplateId>,
    /// Per include slot, the fragment it resolved to (`None` when missing)
    pub resolved: Vec<Option<usize>>,
}

impl Fragment {
    fn parse(id: TemplateId, source: &str) -> Result<Self, TemplateError> {
        let parsed = parser::parse(&id, source)?;
        Ok(Self {
            resolved: vec![None; parsed.includes.len()],
            id,
            nodes: parsed.nodes,
            includes: parsed.includes,
        })
    }
}

/// Built-in Mustache backend.
#[derive(Debug, Clone)]
pub struct MustacheCompiler {
    max_include_depth: usize,
    mock_vars: bool,
}

impl MustacheCompiler {
    /// Compiler with the default include depth limit and marker rendering.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            mock_vars: false,
        }
    }

    /// Set the maximum include nesting depth.
    #[must_use]
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Render missing variables as mock values instead of markers.
    #[must_use]
    pub fn with_mock_vars(mut self, mock_vars: bool) -> Self {
        self.mock_vars = mock_vars;
        self
    }

    /// Compile into the concrete template type.
    pub fn compile_template(
        &self,
        name: &TemplateId,
        loader: &mut dyn TemplateLoader,
    ) -> Result<MustacheTemplate, TemplateError> {
        let source = loader.load(name)?.ok_or_else(|| TemplateError::NotFound {
            name: name.clone(),
        })?;
        let mut fragments = vec![Fragment::parse(name.clone(), &source)?];

        // (fragment index, next include slot to resolve)
        let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
        while let Some(top) = stack.last_mut() {
            let (index, slot) = *top;
            if slot >= fragments[index].includes.len() {
                stack.pop();
                continue;
            }
            top.1 += 1;

            let include = fragments[index].includes[slot].clone();
            if stack.len() > self.max_include_depth {
                return Err(TemplateError::IncludeDepthExceeded {
                    name: include,
                    limit: self.max_include_depth,
                });
            }

            match loader.load(&include)? {
                Some(text) => {
                    fragments.push(Fragment::parse(include, &text)?);
                    let child = fragments.len() - 1;
                    fragments[index].resolved[slot] = Some(child);
                    stack.push((child, 0));
                }
                None => {
                    tracing::debug!(
                        template = %fragments[index].id,
                        include = %include,
                        "Include has no backing template"
                    );
                }
            }
        }

        tracing::trace!(template = %name, fragments = fragments.len(), "Compiled template");
        Ok(MustacheTemplate {
            name: name.clone(),
            fragments,
            mock_vars: self.mock_vars,
        })
    }
}

impl Default for MustacheCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateCompiler for MustacheCompiler {
    fn compile(
        &self,
        name: &TemplateId,
        loader: &mut dyn TemplateLoader,
    ) -> Result<Box<dyn CompiledTemplate>, TemplateError> {
        Ok(Box::new(self.compile_template(name, loader)?))
    }
}

/// A compiled Mustache template and all of its loaded includes.
#[derive(Debug, Clone)]
pub struct MustacheTemplate {
    name: TemplateId,
    fragments: Vec<Fragment>,
    mock_vars: bool,
}

impl MustacheTemplate {
    /// Number of loaded templates, root included.
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    fn segments_of(&self, fragment: &Fragment, nodes: &[Node]) -> Vec<RawSegment> {
        nodes
            .iter()
            .map(|node| match node {
                Node::Text(text) => RawSegment::Text(text.clone()),
                Node::Comment => RawSegment::Opaque,
                Node::Variable {
                    name,
                    line,
                    ..
                } => RawSegment::Variable {
                    name: name.clone(),
                    line: *line,
                },
                Node::Section {
                    name,
                    inverted,
                    line,
                    children,
                } => {
                    let children = self.segments_of(fragment, children);
                    if *inverted {
                        RawSegment::InvertedSection {
                            name: name.clone(),
                            line: *line,
                            children,
                        }
                    } else {
                        RawSegment::Section {
                            name: name.clone(),
                            line: *line,
                            children,
                        }
                    }
                }
                Node::Partial {
                    name,
                    line,
                    slot,
                } => {
                    let children = match fragment.resolved.get(*slot).copied().flatten() {
                        Some(index) => {
                            let included = &self.fragments[index];
                            self.segments_of(included, &included.nodes)
                        }
                        None => Vec::new(),
                    };
                    RawSegment::Include {
                        name: name.to_string(),
                        line: *line,
                        children,
                    }
                }
            })
            .collect()
    }
}

impl CompiledTemplate for MustacheTemplate {
    fn name(&self) -> &TemplateId {
        &self.name
    }

    fn execute(&self, data: &Value) -> Result<String, TemplateError> {
        Ok(Executor::new(&self.fragments, self.mock_vars).run(data))
    }

    fn segments(&self) -> Vec<RawSegment> {
        match self.fragments.first() {
            Some(root) => self.segments_of(root, &root.nodes),
            None => Vec::new(),
        }
    }
}
