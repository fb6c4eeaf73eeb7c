//! Execution of compiled Mustache fragments against a JSON data model.
//!
//! Rendering favours previews over strictness: a variable missing from the
//! data model is replaced by a visible marker (or a mock value), a section
//! over a missing name renders its body once, and an include that could not be
//! loaded renders a marker instead of failing the whole document.

use serde_json::Value;

use crate::constants::{MARKER_CLOSE, MARKER_OPEN, MOCK_SUFFIX_LEN, NULL_VALUE};

use super::compiler::Fragment;
use super::parser::Node;

/// Marker emitted for an include that has no backing template.
#[must_use]
pub fn faulty_partial_marker(name: &str) -> String {
    format!("{MARKER_OPEN}[FAULTY_PARTIAL>{name}]{MARKER_CLOSE}")
}

/// Marker emitted for a variable absent from the data model.
#[must_use]
pub fn faulty_var_marker(name: &str) -> String {
    format!("{MARKER_OPEN}[FAULTY_VAR>{name}]{MARKER_CLOSE}")
}

/// Mock value for a variable absent from the data model: `name[xxxxx]`.
#[must_use]
pub fn mock_value(name: &str) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{name}[{}]", &random[..MOCK_SUFFIX_LEN])
}

fn is_falsey(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => NULL_VALUE.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Walks a fragment arena, writing output into a string buffer.
pub(crate) struct Executor<'a> {
    fragments: &'a [Fragment],
    mock_vars: bool,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(fragments: &'a [Fragment], mock_vars: bool) -> Self {
        Self {
            fragments,
            mock_vars,
        }
    }

    /// Render the root fragment (index 0).
    pub(crate) fn run(&self, data: &Value) -> String {
        let mut out = String::new();
        if let Some(root) = self.fragments.first() {
            let mut stack = vec![data];
            self.render_nodes(root, &root.nodes, &mut stack, &mut out);
        }
        out
    }

    fn render_nodes<'v>(
        &self,
        fragment: &Fragment,
        nodes: &[Node],
        stack: &mut Vec<&'v Value>,
        out: &mut String,
    ) {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Comment => {}
                Node::Variable {
                    name,
                    escaped,
                    ..
                } => match lookup(stack, name) {
                    Some(value) => {
                        let text = stringify(value);
                        if *escaped {
                            out.push_str(&tera::escape_html(&text));
                        } else {
                            out.push_str(&text);
                        }
                    }
                    None if self.mock_vars => out.push_str(&mock_value(name)),
                    None => out.push_str(&faulty_var_marker(name)),
                },
                Node::Section {
                    name,
                    inverted: false,
                    children,
                    ..
                } => match lookup(stack, name) {
                    // Preview: show the body once when the data model lacks the name
                    None => self.render_nodes(fragment, children, stack, out),
                    Some(value) if is_falsey(value) => {}
                    Some(Value::Array(items)) => {
                        for item in items {
                            stack.push(item);
                            self.render_nodes(fragment, children, stack, out);
                            stack.pop();
                        }
                    }
                    Some(value) => {
                        stack.push(value);
                        self.render_nodes(fragment, children, stack, out);
                        stack.pop();
                    }
                },
                Node::Section {
                    name,
                    inverted: true,
                    children,
                    ..
                } => {
                    if lookup(stack, name).is_some_and(is_falsey) {
                        self.render_nodes(fragment, children, stack, out);
                    }
                }
                Node::Partial {
                    name,
                    slot,
                    ..
                } => match fragment.resolved.get(*slot).copied().flatten() {
                    Some(index) => {
                        let included = &self.fragments[index];
                        self.render_nodes(included, &included.nodes, stack, out);
                    }
                    None => out.push_str(&faulty_partial_marker(name.as_str())),
                },
            }
        }
    }
}

/// Resolve `name` against the context stack, innermost first.
///
/// `.` is the innermost value; dotted names resolve their first segment
/// against the stack and the rest by walking into objects.
fn lookup<'v>(stack: &[&'v Value], name: &str) -> Option<&'v Value> {
    if name == "." {
        return stack.last().copied();
    }

    let mut segments = name.split('.');
    let first = segments.next()?;
    let mut value = stack.iter().rev().copied().find_map(|ctx| ctx.get(first))?;
    for segment in segments {
        value = match value {
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            other => other.get(segment)?,
        };
    }
    Some(value)
}
