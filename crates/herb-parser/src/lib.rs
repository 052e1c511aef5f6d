//! Herb Parser
//!
//! Parses the token stream from `herb-lexer` into a `Document` tree.
//! Parsing never fails: malformed input produces a best-effort tree plus a
//! list of errors, each also attached to the node where it was recovered.
//!
//! After parsing, the analyzer optionally rewrites sequences of ERB control
//! flow tags (`if`/`elsif`/`else`/`end`, loops, blocks, ...) into structured
//! nodes, and `inspect` renders trees and token streams as stable text dumps.
//!
//! ```
//! use herb_parser::{Node, Parser};
//!
//! let result = Parser::parse("<p><%= title %></p>");
//! assert!(!result.has_errors());
//! assert!(matches!(result.document.children[0], Node::Element(_)));
//! ```

pub mod analyzer;
pub mod ast;
pub mod inspect;
pub mod options;
pub mod parser;

use std::fmt;

pub use ast::{
    Attribute, AttributeValue, ClauseKind, CloseTag, Comment, Doctype, Document, Element,
    ErbBegin, ErbBlock, ErbCase, ErbClause, ErbIf, ErbKind, ErbLoop, ErbNode, ErbSubsequent,
    ErbUnless, LoopKind, Node, OpenTag, Text, Whitespace,
};
pub use herb_lexer::{Location, Position, Span};
pub use options::ParserOptions;
pub use parser::Parser;

/// Deepest tree the parser and analyzer build. Elements opened below this
/// depth get no children, and control flow below it stays flat ERB.
pub const MAX_NESTING_DEPTH: usize = 128;

use herb_lexer::TokenKind;

/// How serious a recovered problem is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// The problems the parser recovers from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("Element `<{tag}>` was opened but never closed")]
    UnclosedElement { tag: String },

    #[error("Expected closing tag `</{expected}>`, found `</{found}>`")]
    MismatchedClosingTag { expected: String, found: String },

    #[error("Found closing tag `</{tag}>` without a matching opening tag")]
    UnexpectedClosingTag { tag: String },

    #[error("Void element `<{tag}>` cannot have a closing tag")]
    VoidElementClosingTag { tag: String },

    #[error("Tag `{tag}` is missing its closing `>`")]
    MissingTagEnd { tag: String },

    #[error("Expected an attribute name before the value")]
    MissingAttributeName,

    #[error("Expected a value for attribute `{name}` after `=`")]
    MissingAttributeValue { name: String },

    #[error("Quoted attribute value was never closed with `{quote}`")]
    UnclosedQuote { quote: char },

    #[error("ERB tag was opened but never closed with `%>`")]
    UnclosedErbTag,

    #[error("HTML comment was opened but never closed with `-->`")]
    UnclosedComment,

    #[error("Unexpected token {found}")]
    UnexpectedToken { found: TokenKind },

    #[error("Invalid character in source")]
    InvalidCharacter,

    #[error("Element `<{tag}>` is nested deeper than {depth} levels, its content is parsed as siblings")]
    NestingTooDeep { tag: String, depth: usize },
}

impl ParseErrorKind {
    /// Stable name used by the tree dump.
    pub fn name(&self) -> &'static str {
        match self {
            ParseErrorKind::UnclosedElement { .. } => "UnclosedElementError",
            ParseErrorKind::MismatchedClosingTag { .. } => "MismatchedClosingTagError",
            ParseErrorKind::UnexpectedClosingTag { .. } => "UnexpectedClosingTagError",
            ParseErrorKind::VoidElementClosingTag { .. } => "VoidElementClosingTagError",
            ParseErrorKind::MissingTagEnd { .. } => "MissingTagEndError",
            ParseErrorKind::MissingAttributeName => "MissingAttributeNameError",
            ParseErrorKind::MissingAttributeValue { .. } => "MissingAttributeValueError",
            ParseErrorKind::UnclosedQuote { .. } => "UnclosedQuoteError",
            ParseErrorKind::UnclosedErbTag => "UnclosedERBTagError",
            ParseErrorKind::UnclosedComment => "UnclosedCommentError",
            ParseErrorKind::UnexpectedToken { .. } => "UnexpectedTokenError",
            ParseErrorKind::InvalidCharacter => "InvalidCharacterError",
            ParseErrorKind::NestingTooDeep { .. } => "NestingTooDeepError",
        }
    }
}

/// Parser error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "Parse {} at line {}, column {}: {}",
    .severity,
    .location.start.line,
    .location.start.column,
    .kind
)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub location: Location,
    pub severity: Severity,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span, location: Location, severity: Severity) -> Self {
        Self {
            kind,
            span,
            location,
            severity,
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Output of a parse: the tree, every recovered error in detection order,
/// and the options that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub document: Document,
    pub errors: Vec<ParseError>,
    pub options: ParserOptions,
}

impl ParseResult {
    /// True when at least one error (not warning) was recovered.
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|error| error.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ParseError> {
        self.errors.iter().filter(|error| error.is_warning())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_display() {
        let error = ParseError::new(
            ParseErrorKind::UnclosedElement {
                tag: "div".to_string(),
            },
            Span::new(0, 5),
            Location::new(Position::new(2, 3), Position::new(2, 8)),
            Severity::Error,
        );
        assert_eq!(
            error.to_string(),
            "Parse error at line 2, column 3: Element `<div>` was opened but never closed"
        );
        assert_eq!(error.message(), "Element `<div>` was opened but never closed");
    }

    #[test]
    fn test_warning_does_not_count_as_error() {
        let warning = ParseError::new(
            ParseErrorKind::UnclosedElement {
                tag: "li".to_string(),
            },
            Span::new(0, 4),
            Location::default(),
            Severity::Warning,
        );
        let result = ParseResult {
            document: Document {
                children: Vec::new(),
                span: Span::new(0, 4),
                location: Location::default(),
            },
            errors: vec![warning],
            options: ParserOptions::default(),
        };
        assert!(!result.has_errors());
        assert_eq!(result.warnings().count(), 1);
    }

    #[test]
    fn test_error_kind_names() {
        assert_eq!(ParseErrorKind::UnclosedErbTag.name(), "UnclosedERBTagError");
        assert_eq!(
            ParseErrorKind::UnexpectedToken {
                found: TokenKind::Equals
            }
            .to_string(),
            "Unexpected token TOKEN_EQUALS"
        );
    }
}
