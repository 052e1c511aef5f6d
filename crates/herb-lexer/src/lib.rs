//! Herb Lexer
//!
//! Tokenizes HTML+ERB templates into a stream of tokens.
//! Handles tags, attributes, quoted values, comments, doctypes, raw text
//! elements and the embedded `<% %>` family of ERB tags.
//!
//! Lexing never fails: unrecognized characters and unterminated constructs
//! become `Error` tokens, with a matching [`LexerError`] in [`LexResult::errors`].
//!
//! # Example
//!
//! ```
//! use herb_lexer::{Scanner, TokenKind};
//!
//! let tokens = Scanner::tokenize("");
//! assert_eq!(tokens.len(), 1); // Just EOF
//! assert_eq!(tokens[0].kind, TokenKind::Eof);
//! ```

pub mod scanner;
pub mod token;

#[cfg(test)]
mod property_tests;

pub use scanner::{Scanner, ScannerMode};
pub use token::{
    is_raw_text_element, is_void_element, Location, Position, Span, Token, TokenKind,
};

/// Lexer diagnostic with position information. Never aborts lexing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Lexer error at line {line}, column {column}: {message}")]
pub struct LexerError {
    pub message: String,
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

/// Tokens for a whole source plus the diagnostics collected while scanning.
#[derive(Debug, Clone, PartialEq)]
pub struct LexResult<'src> {
    pub tokens: Vec<Token<'src>>,
    pub errors: Vec<LexerError>,
}

impl LexResult<'_> {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
