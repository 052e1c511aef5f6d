//! Abstract Syntax Tree for HTML+ERB templates.
//!
//! Every node owns its children and carries its source span, its location
//! and the parse errors recovered at that node. Markup nodes are produced by
//! the parser; the `Erb*` control-flow nodes are produced by the analyzer
//! from flat sequences of ERB tags.

use crate::ParseError;
use herb_lexer::{Location, Span};

/// The root of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub children: Vec<Node>,
    pub span: Span,
    pub location: Location,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An HTML element with its open tag, body and optional close tag.
    Element(Element),

    /// A close tag that matches no open element.
    CloseTag(CloseTag),

    /// An attribute inside an open tag.
    Attribute(Attribute),

    /// Literal text content.
    Text(Text),

    /// Whitespace inside a tag; only present when whitespace tracking is on.
    Whitespace(Whitespace),

    /// An `<!-- ... -->` comment.
    Comment(Comment),

    /// A `<!DOCTYPE ...>` declaration.
    Doctype(Doctype),

    /// A flat `<% %>`, `<%= %>` or `<%# %>` tag.
    Erb(ErbNode),

    /// `<% if %> ... <% elsif %> ... <% else %> ... <% end %>`
    ErbIf(ErbIf),

    /// `<% unless %> ... <% else %> ... <% end %>`
    ErbUnless(ErbUnless),

    /// `<% case %> <% when %> ... <% else %> ... <% end %>`
    ErbCase(ErbCase),

    /// `<% while %>`, `<% until %>` or `<% for %>` up to its `<% end %>`
    ErbLoop(ErbLoop),

    /// `<% ... do |args| %> ... <% end %>`
    ErbBlock(ErbBlock),

    /// `<% begin %> ... <% rescue %> ... <% ensure %> ... <% end %>`
    ErbBegin(ErbBegin),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Element(node) => node.span,
            Node::CloseTag(node) => node.span,
            Node::Attribute(node) => node.span,
            Node::Text(node) => node.span,
            Node::Whitespace(node) => node.span,
            Node::Comment(node) => node.span,
            Node::Doctype(node) => node.span,
            Node::Erb(node) => node.span,
            Node::ErbIf(node) => node.span,
            Node::ErbUnless(node) => node.span,
            Node::ErbCase(node) => node.span,
            Node::ErbLoop(node) => node.span,
            Node::ErbBlock(node) => node.span,
            Node::ErbBegin(node) => node.span,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            Node::Element(node) => node.location,
            Node::CloseTag(node) => node.location,
            Node::Attribute(node) => node.location,
            Node::Text(node) => node.location,
            Node::Whitespace(node) => node.location,
            Node::Comment(node) => node.location,
            Node::Doctype(node) => node.location,
            Node::Erb(node) => node.location,
            Node::ErbIf(node) => node.location,
            Node::ErbUnless(node) => node.location,
            Node::ErbCase(node) => node.location,
            Node::ErbLoop(node) => node.location,
            Node::ErbBlock(node) => node.location,
            Node::ErbBegin(node) => node.location,
        }
    }

    /// Errors recovered at this node. Control-flow nodes report the errors
    /// of their opening tag.
    pub fn errors(&self) -> &[ParseError] {
        match self {
            Node::Element(node) => &node.errors,
            Node::CloseTag(node) => &node.errors,
            Node::Attribute(node) => &node.errors,
            Node::Text(node) => &node.errors,
            Node::Whitespace(_) => &[],
            Node::Comment(node) => &node.errors,
            Node::Doctype(node) => &node.errors,
            Node::Erb(node) => &node.errors,
            Node::ErbIf(node) => &node.tag.errors,
            Node::ErbUnless(node) => &node.tag.errors,
            Node::ErbCase(node) => &node.tag.errors,
            Node::ErbLoop(node) => &node.tag.errors,
            Node::ErbBlock(node) => &node.tag.errors,
            Node::ErbBegin(node) => &node.tag.errors,
        }
    }
}

// ---------------------------------------------------------------------------
// Markup
// ---------------------------------------------------------------------------

/// An HTML element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag_name: String,
    pub open_tag: OpenTag,
    pub children: Vec<Node>,
    pub close_tag: Option<CloseTag>,
    pub is_void: bool,
    pub span: Span,
    pub location: Location,
    pub errors: Vec<ParseError>,
}

impl Element {
    /// Attributes of the open tag, in source order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.open_tag.children.iter().filter_map(|child| match child {
            Node::Attribute(attribute) => Some(attribute),
            _ => None,
        })
    }

    /// First attribute with the given name (ASCII case-insensitive).
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes()
            .find(|attribute| attribute.name.eq_ignore_ascii_case(name))
    }
}

/// `<tag ...>`: attributes, whitespace and ERB tags in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenTag {
    pub tag_name: String,
    pub children: Vec<Node>,
    pub self_closing: bool,
    pub span: Span,
    pub location: Location,
    pub errors: Vec<ParseError>,
}

/// `</tag>`
#[derive(Debug, Clone, PartialEq)]
pub struct CloseTag {
    pub tag_name: String,
    pub children: Vec<Node>,
    pub span: Span,
    pub location: Location,
    pub errors: Vec<ParseError>,
}

/// An attribute. `equals` records a `=` even when the value is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub equals: bool,
    pub value: Option<AttributeValue>,
    /// Tracked whitespace around the `=`.
    pub children: Vec<Node>,
    pub span: Span,
    pub location: Location,
    pub errors: Vec<ParseError>,
}

/// A quoted or bare attribute value made of text and ERB tags.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeValue {
    pub quote: Option<char>,
    pub children: Vec<Node>,
    pub span: Span,
    pub location: Location,
}

impl AttributeValue {
    /// The literal value, or `None` when the value contains ERB.
    pub fn static_value(&self) -> Option<String> {
        let mut value = String::new();
        for child in &self.children {
            match child {
                Node::Text(text) => value.push_str(&text.content),
                _ => return None,
            }
        }
        Some(value)
    }
}

/// Literal text content.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub content: String,
    pub span: Span,
    pub location: Location,
    pub errors: Vec<ParseError>,
}

/// Whitespace between the parts of a tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Whitespace {
    pub value: String,
    pub span: Span,
    pub location: Location,
}

/// An HTML comment; `closed` is false when `-->` is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub children: Vec<Node>,
    pub closed: bool,
    pub span: Span,
    pub location: Location,
    pub errors: Vec<ParseError>,
}

/// `<!DOCTYPE ...>`; `content` is the raw text between the keyword and `>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Doctype {
    pub content: String,
    pub span: Span,
    pub location: Location,
    pub errors: Vec<ParseError>,
}

// ---------------------------------------------------------------------------
// ERB
// ---------------------------------------------------------------------------

/// What an ERB tag does with its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErbKind {
    /// `<% %>` and `<%- %>`: evaluated, not emitted.
    Statement,
    /// `<%= %>` and `<%== %>`: evaluated and emitted.
    Output,
    /// `<%# %>`: ignored.
    Comment,
}

/// A single ERB tag. `tag_closing` is `None` when `%>` is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct ErbNode {
    pub kind: ErbKind,
    pub tag_opening: String,
    pub content: String,
    pub tag_closing: Option<String>,
    pub content_span: Span,
    pub span: Span,
    pub location: Location,
    pub errors: Vec<ParseError>,
}

/// An `if` (or `elsif`) branch. `end_tag` is `None` for `elsif` branches,
/// which end where their subsequent branch starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ErbIf {
    pub tag: ErbNode,
    pub condition: String,
    pub statements: Vec<Node>,
    pub subsequent: Option<Box<ErbSubsequent>>,
    pub end_tag: Option<ErbNode>,
    pub span: Span,
    pub location: Location,
}

/// What follows an `if` branch.
#[derive(Debug, Clone, PartialEq)]
pub enum ErbSubsequent {
    Elsif(ErbIf),
    Else(ErbClause),
}

/// Keyword introducing a clause inside a control-flow construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    Else,
    When,
    Rescue,
    Ensure,
}

/// An `else`, `when`, `rescue` or `ensure` clause and the nodes it owns.
/// `argument` is the text after the keyword (`when` values, rescued classes).
#[derive(Debug, Clone, PartialEq)]
pub struct ErbClause {
    pub kind: ClauseKind,
    pub tag: ErbNode,
    pub argument: String,
    pub statements: Vec<Node>,
    pub span: Span,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErbUnless {
    pub tag: ErbNode,
    pub condition: String,
    pub statements: Vec<Node>,
    pub else_clause: Option<ErbClause>,
    pub end_tag: ErbNode,
    pub span: Span,
    pub location: Location,
}

/// `children` holds whatever sits between `case` and the first `when`.
#[derive(Debug, Clone, PartialEq)]
pub struct ErbCase {
    pub tag: ErbNode,
    pub subject: String,
    pub children: Vec<Node>,
    pub conditions: Vec<ErbClause>,
    pub else_clause: Option<ErbClause>,
    pub end_tag: ErbNode,
    pub span: Span,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    While,
    Until,
    For,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErbLoop {
    pub kind: LoopKind,
    pub tag: ErbNode,
    pub condition: String,
    pub statements: Vec<Node>,
    pub end_tag: ErbNode,
    pub span: Span,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErbBlock {
    pub tag: ErbNode,
    pub body: Vec<Node>,
    pub end_tag: ErbNode,
    pub span: Span,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErbBegin {
    pub tag: ErbNode,
    pub statements: Vec<Node>,
    pub rescue_clauses: Vec<ErbClause>,
    pub else_clause: Option<ErbClause>,
    pub ensure_clause: Option<ErbClause>,
    pub end_tag: ErbNode,
    pub span: Span,
    pub location: Location,
}
