//! Herb: HTML+ERB lexer, parser and extractor.
//!
//! One-call entry points over the `herb-lexer`, `herb-parser` and
//! `herb-extract` crates. Every function is pure: it owns nothing beyond
//! its input and never fails. Malformed templates come back as trees
//! carrying errors.
//!
//! ```
//! let result = herb::parse("<div><%= user.name %></div>");
//! assert!(!result.has_errors());
//!
//! let ruby = herb::extract_ruby("<div><%= user.name %></div>");
//! assert!(ruby.contains("user.name"));
//! ```

pub use herb_extract::ExtractOptions;
pub use herb_lexer::{LexResult, LexerError, Location, Position, Span, Token, TokenKind};
pub use herb_parser::{
    ast, inspect, Document, Node, ParseError, ParseErrorKind, ParseResult, ParserOptions,
    Severity, MAX_NESTING_DEPTH,
};

/// Tokenize `source`. The stream always ends with a single EOF token.
pub fn lex(source: &str) -> LexResult<'_> {
    herb_lexer::Scanner::lex(source)
}

/// Parse `source` with default options.
pub fn parse(source: &str) -> ParseResult {
    herb_parser::Parser::parse(source)
}

pub fn parse_with_options(source: &str, options: &ParserOptions) -> ParseResult {
    herb_parser::Parser::parse_with_options(source, *options)
}

/// The Ruby code of `source`, at its original offsets.
pub fn extract_ruby(source: &str) -> String {
    extract_ruby_with_options(source, &ExtractOptions::default())
}

pub fn extract_ruby_with_options(source: &str, options: &ExtractOptions) -> String {
    let document = parse(source).document;
    herb_extract::extract_ruby(&document, source, options)
}

/// The HTML of `source` with every ERB tag blanked.
pub fn extract_html(source: &str) -> String {
    let document = parse(source).document;
    herb_extract::extract_html(&document, source)
}

/// Product name and version.
pub fn version() -> String {
    format!("herb v{} (Rust)", env!("CARGO_PKG_VERSION"))
}
