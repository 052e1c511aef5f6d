//! Herb Extract
//!
//! Splits an HTML+ERB template into its two languages. Each extraction
//! keeps one language and blanks the other with spaces, keeping line
//! breaks, so byte offsets and line numbers in the output match the
//! template. The results can be handed to a Ruby or HTML tool and its
//! diagnostics mapped straight back.
//!
//! ```text
//! source:        <p><%= user.name %></p>
//! extract_ruby:         user.name
//! extract_html:  <p>                 </p>
//! ```

pub mod html;
pub mod ruby;

#[cfg(test)]
mod property_tests;

pub use html::extract_html;
pub use ruby::extract_ruby;

use herb_parser::{Document, ErbClause, ErbIf, ErbNode, ErbSubsequent, Node, Span};
use serde::{Deserialize, Serialize};

/// Options for [`extract_ruby`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Write `;` over the first byte of each closing `%>` so that
    /// consecutive tags on one line stay separate Ruby statements.
    pub semicolons: bool,
    /// Keep `<%# %>` comments as Ruby comments.
    pub comments: bool,
    /// Keep every byte offset. When false, tag contents are trimmed and
    /// joined with newlines.
    pub preserve_positions: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            semicolons: true,
            comments: false,
            preserve_positions: true,
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn semicolons(mut self, semicolons: bool) -> Self {
        self.semicolons = semicolons;
        self
    }

    pub fn comments(mut self, comments: bool) -> Self {
        self.comments = comments;
        self
    }

    pub fn preserve_positions(mut self, preserve_positions: bool) -> Self {
        self.preserve_positions = preserve_positions;
        self
    }
}

// =========================================================================
// Tree walk
// =========================================================================

/// Every ERB tag in `document`, in source order, including the tags owned
/// by analyzed control-flow nodes and tags inside attributes and comments.
pub fn erb_nodes(document: &Document) -> Vec<&ErbNode> {
    let mut tags = Vec::new();
    visit_all(&document.children, &mut tags);
    tags
}

fn visit_all<'a>(nodes: &'a [Node], tags: &mut Vec<&'a ErbNode>) {
    for node in nodes {
        visit(node, tags);
    }
}

fn visit<'a>(node: &'a Node, tags: &mut Vec<&'a ErbNode>) {
    match node {
        Node::Element(element) => {
            visit_all(&element.open_tag.children, tags);
            visit_all(&element.children, tags);
        }
        Node::Attribute(attribute) => {
            if let Some(value) = &attribute.value {
                visit_all(&value.children, tags);
            }
        }
        Node::Comment(comment) => visit_all(&comment.children, tags),
        Node::Erb(erb) => tags.push(erb),
        Node::ErbIf(node) => visit_if(node, tags),
        Node::ErbUnless(node) => {
            tags.push(&node.tag);
            visit_all(&node.statements, tags);
            visit_clause(node.else_clause.as_ref(), tags);
            tags.push(&node.end_tag);
        }
        Node::ErbCase(node) => {
            tags.push(&node.tag);
            visit_all(&node.children, tags);
            for clause in &node.conditions {
                visit_clause(Some(clause), tags);
            }
            visit_clause(node.else_clause.as_ref(), tags);
            tags.push(&node.end_tag);
        }
        Node::ErbLoop(node) => {
            tags.push(&node.tag);
            visit_all(&node.statements, tags);
            tags.push(&node.end_tag);
        }
        Node::ErbBlock(node) => {
            tags.push(&node.tag);
            visit_all(&node.body, tags);
            tags.push(&node.end_tag);
        }
        Node::ErbBegin(node) => {
            tags.push(&node.tag);
            visit_all(&node.statements, tags);
            for clause in &node.rescue_clauses {
                visit_clause(Some(clause), tags);
            }
            visit_clause(node.else_clause.as_ref(), tags);
            visit_clause(node.ensure_clause.as_ref(), tags);
            tags.push(&node.end_tag);
        }
        Node::CloseTag(_) | Node::Text(_) | Node::Whitespace(_) | Node::Doctype(_) => {}
    }
}

fn visit_if<'a>(node: &'a ErbIf, tags: &mut Vec<&'a ErbNode>) {
    tags.push(&node.tag);
    visit_all(&node.statements, tags);
    match node.subsequent.as_deref() {
        Some(ErbSubsequent::Elsif(branch)) => visit_if(branch, tags),
        Some(ErbSubsequent::Else(clause)) => visit_clause(Some(clause), tags),
        None => {}
    }
    if let Some(end_tag) = &node.end_tag {
        tags.push(end_tag);
    }
}

fn visit_clause<'a>(clause: Option<&'a ErbClause>, tags: &mut Vec<&'a ErbNode>) {
    if let Some(clause) = clause {
        tags.push(&clause.tag);
        visit_all(&clause.statements, tags);
    }
}

// =========================================================================
// Blanking
// =========================================================================

/// Write `text` with every char replaced by spaces of the same byte width.
/// Line breaks are kept.
fn blank_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '\n' | '\r' => out.push(ch),
            _ => out.extend(std::iter::repeat(' ').take(ch.len_utf8())),
        }
    }
}

/// Blank all of `source` except `keep`, whose spans are written with the
/// paired text. Each text must have its span's byte length; spans must be
/// sorted and disjoint.
fn overlay(source: &str, keep: &[(Span, &str)]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;

    for (span, text) in keep {
        if span.start < cursor || text.len() != span.len() {
            continue;
        }
        let Some(gap) = source.get(cursor..span.start) else {
            continue;
        };
        blank_into(gap, &mut out);
        out.push_str(text);
        cursor = span.end;
    }

    blank_into(source.get(cursor..).unwrap_or_default(), &mut out);
    out
}
