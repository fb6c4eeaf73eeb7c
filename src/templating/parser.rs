//! Tokenizer and parser for the supported Mustache subset.
//!
//! Parsing is a single pass with an explicit stack of open sections, so deeply
//! nested sections never grow the native call stack.

use crate::core::TemplateId;

use super::error::TemplateError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const OPEN_TRIPLE: &str = "{{{";
const CLOSE_TRIPLE: &str = "}}}";

/// Parsed template node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Text(String),
    Variable {
        name: String,
        escaped: bool,
        line: usize,
    },
    Section {
        name: String,
        inverted: bool,
        line: usize,
        children: Vec<Node>,
    },
    /// `slot` indexes the owning fragment's include list
    Partial {
        name: TemplateId,
        line: usize,
        slot: usize,
    },
    Comment,
}

/// Nodes of one template plus its distinct includes in first-occurrence order.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedTemplate {
    pub nodes: Vec<Node>,
    pub includes: Vec<TemplateId>,
}

struct OpenSection {
    name: String,
    inverted: bool,
    line: usize,
    siblings: Vec<Node>,
}

fn newlines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}

/// Parse `source`, the text of template `template`.
pub(crate) fn parse(template: &TemplateId, source: &str) -> Result<ParsedTemplate, TemplateError> {
    let syntax = |line: usize, message: String| TemplateError::Syntax {
        template: template.clone(),
        line,
        message,
    };

    let mut open: Vec<OpenSection> = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    let mut includes = Vec::new();
    let mut rest = source;
    let mut line = 1;

    while let Some(start) = rest.find(OPEN) {
        let (text, after) = rest.split_at(start);
        if !text.is_empty() {
            current.push(Node::Text(text.to_string()));
            line += newlines(text);
        }
        let tag_line = line;

        let (body, close, triple) = if after.starts_with(OPEN_TRIPLE) {
            (&after[OPEN_TRIPLE.len()..], CLOSE_TRIPLE, true)
        } else {
            (&after[OPEN.len()..], CLOSE, false)
        };
        let end = body.find(close).ok_or_else(|| syntax(tag_line, "unclosed tag".to_string()))?;
        let content = &body[..end];
        line += newlines(content);
        rest = &body[end + close.len()..];

        let content = content.trim();
        if triple {
            if content.is_empty() {
                return Err(syntax(tag_line, "empty tag".to_string()));
            }
            current.push(Node::Variable {
                name: content.to_string(),
                escaped: false,
                line: tag_line,
            });
            continue;
        }

        let (sigil, name) = match content.chars().next() {
            Some(c @ ('#' | '^' | '/' | '>' | '!' | '&' | '=')) => (Some(c), content[1..].trim()),
            _ => (None, content),
        };

        match sigil {
            Some('!') => current.push(Node::Comment),
            Some('=') => {
                return Err(syntax(tag_line, "delimiter changes are not supported".to_string()));
            }
            _ if name.is_empty() => return Err(syntax(tag_line, "empty tag".to_string())),
            Some(c @ ('#' | '^')) => open.push(OpenSection {
                name: name.to_string(),
                inverted: c == '^',
                line: tag_line,
                siblings: std::mem::take(&mut current),
            }),
            Some('/') => {
                let section = open
                    .pop()
                    .ok_or_else(|| syntax(tag_line, format!("unexpected closing tag '{name}'")))?;
                if section.name != name {
                    return Err(syntax(
                        tag_line,
                        format!(
                            "closing tag '{name}' does not match open section '{}' from line {}",
                            section.name, section.line
                        ),
                    ));
                }
                let children = std::mem::replace(&mut current, section.siblings);
                current.push(Node::Section {
                    name: section.name,
                    inverted: section.inverted,
                    line: section.line,
                    children,
                });
            }
            Some('>') => {
                let id = TemplateId::new(name);
                if id.is_empty() {
                    return Err(syntax(tag_line, format!("invalid partial name '{name}'")));
                }
                // Repeated names share a slot, so siblings load their partial once
                let slot = match includes.iter().position(|known| *known == id) {
                    Some(slot) => slot,
                    None => {
                        includes.push(id.clone());
                        includes.len() - 1
                    }
                };
                current.push(Node::Partial {
                    name: id,
                    line: tag_line,
                    slot,
                });
            }
            Some('&') => current.push(Node::Variable {
                name: name.to_string(),
                escaped: false,
                line: tag_line,
            }),
            _ => current.push(Node::Variable {
                name: name.to_string(),
                escaped: true,
                line: tag_line,
            }),
        }
    }

    if !rest.is_empty() {
        current.push(Node::Text(rest.to_string()));
    }

    if let Some(section) = open.pop() {
        return Err(syntax(section.line, format!("unclosed section '{}'", section.name)));
    }

    Ok(ParsedTemplate {
        nodes: current,
        includes,
    })
}
