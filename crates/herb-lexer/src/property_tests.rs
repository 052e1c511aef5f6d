//! Property-based tests for the scanner.
//!
//! 1. **Scanner never panics**: arbitrary input always produces tokens
//! 2. **EOF is always last**, and appears exactly once
//! 3. **Tokens tile the source**: contiguous spans whose values rebuild the input
//! 4. **Values match spans**: every `value` is the source slice of its span

use proptest::prelude::*;

use crate::scanner::Scanner;
use crate::token::TokenKind;

/// Fragments biased towards the interesting boundaries between modes.
const FRAGMENTS: &[&str] = &[
    "<", ">", "</", "/>", "<%", "<%=", "<%#", "<%-", "<%%", "%>", "-%>", "<!--", "-->",
    "<!DOCTYPE", "\"", "'", "=", " ", "\n", "\r\n", "div", "script", "</script>", "<script>",
    "é", "\0", "if", "end",
];

fn template() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..40).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn eof_is_last_and_unique(source in any::<String>()) {
        let tokens = Scanner::tokenize(&source);
        prop_assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
        prop_assert_eq!(tokens.iter().filter(|t| t.kind == TokenKind::Eof).count(), 1);
    }

    #[test]
    fn tokens_tile_arbitrary_source(source in any::<String>()) {
        let tokens = Scanner::tokenize(&source);
        let mut offset = 0;
        for token in &tokens {
            prop_assert_eq!(token.span.start, offset);
            prop_assert_eq!(token.value, &source[token.span.start..token.span.end]);
            offset = token.span.end;
        }
        prop_assert_eq!(offset, source.len());
    }

    #[test]
    fn tokens_tile_template_source(source in template()) {
        let tokens = Scanner::tokenize(&source);
        let rebuilt: String = tokens.iter().map(|t| t.value).collect();
        prop_assert_eq!(rebuilt, source);
    }

    #[test]
    fn locations_are_monotonic(source in template()) {
        let tokens = Scanner::tokenize(&source);
        for pair in tokens.windows(2) {
            let (a, b) = (pair[0].location.start, pair[1].location.start);
            prop_assert!((a.line, a.column) <= (b.line, b.column));
        }
    }

    #[test]
    fn scanner_is_deterministic(source in template()) {
        prop_assert_eq!(Scanner::tokenize(&source), Scanner::tokenize(&source));
    }
}
