//! Property-based tests for extraction.
//!
//! 1. **Offsets are kept**: both extractions return exactly as many bytes as the source
//! 2. **Lines are kept**: line breaks stay at the same byte offsets
//! 3. **Only blanking**: every kept byte is the source byte at that offset
//! 4. **Analysis is invisible**: flat and analyzed trees extract identically

use proptest::prelude::*;

use crate::{extract_html, extract_ruby, ExtractOptions};
use herb_parser::{Parser, ParserOptions};

const FRAGMENTS: &[&str] = &[
    "<div>", "</div>", "<p class=\"", "\">", "<br>", "<%", "<%=", "<%#", "<%-", "-%>", "%>",
    "<%%", "<!--", "-->", " if x ", " else ", " end ", " items.each do |i| ", "\n", "é", "a",
    "'", "=",
];

fn template() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..40).prop_map(|parts| parts.concat())
}

fn line_breaks(text: &str) -> Vec<usize> {
    text.match_indices(|c: char| c == '\n' || c == '\r').map(|(index, _)| index).collect()
}

proptest! {
    #[test]
    fn extraction_keeps_length(source in template()) {
        let document = Parser::parse(&source).document;
        let ruby = extract_ruby(&document, &source, &ExtractOptions::default());
        let html = extract_html(&document, &source);
        prop_assert_eq!(ruby.len(), source.len());
        prop_assert_eq!(html.len(), source.len());
    }

    #[test]
    fn extraction_keeps_arbitrary_length(source in any::<String>()) {
        let document = Parser::parse(&source).document;
        prop_assert_eq!(extract_html(&document, &source).len(), source.len());
        prop_assert_eq!(
            extract_ruby(&document, &source, &ExtractOptions::default()).len(),
            source.len()
        );
    }

    #[test]
    fn extraction_keeps_lines(source in template()) {
        let document = Parser::parse(&source).document;
        let ruby = extract_ruby(&document, &source, &ExtractOptions::default());
        let html = extract_html(&document, &source);
        prop_assert_eq!(line_breaks(&ruby), line_breaks(&source));
        prop_assert_eq!(line_breaks(&html), line_breaks(&source));
    }

    #[test]
    fn html_only_blanks(source in template()) {
        let document = Parser::parse(&source).document;
        let html = extract_html(&document, &source);
        for (kept, original) in html.bytes().zip(source.bytes()) {
            prop_assert!(kept == original || kept == b' ');
        }
    }

    #[test]
    fn analysis_does_not_change_extraction(source in template()) {
        let analyzed = Parser::parse(&source).document;
        let flat = Parser::parse_with_options(&source, ParserOptions::new().analyze(false)).document;
        let options = ExtractOptions::default();
        prop_assert_eq!(
            extract_ruby(&analyzed, &source, &options),
            extract_ruby(&flat, &source, &options)
        );
        prop_assert_eq!(extract_html(&analyzed, &source), extract_html(&flat, &source));
    }
}
