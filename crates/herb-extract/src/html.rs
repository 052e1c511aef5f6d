//! HTML extraction.

use crate::{erb_nodes, overlay};
use herb_parser::{Document, Span};

/// Copy `source` with every ERB tag, delimiters included, blanked out.
pub fn extract_html(document: &Document, source: &str) -> String {
    let mut keep: Vec<(Span, &str)> = Vec::new();
    let mut cursor = 0;

    for erb in erb_nodes(document) {
        if erb.span.start > cursor {
            let span = Span::new(cursor, erb.span.start);
            if let Some(text) = source.get(span.start..span.end) {
                keep.push((span, text));
            }
        }
        cursor = cursor.max(erb.span.end);
    }

    if let Some(rest) = source.get(cursor..) {
        keep.push((Span::new(cursor, source.len()), rest));
    }

    overlay(source, &keep)
}
