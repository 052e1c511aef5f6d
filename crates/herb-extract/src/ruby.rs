//! Ruby extraction.

use crate::{erb_nodes, overlay, ExtractOptions};
use herb_parser::{Document, ErbKind, ErbNode, Span};

/// Extract the Ruby code of every ERB tag in `document`.
///
/// With `preserve_positions` set, the code sits at its original byte
/// offsets and everything else is blanked.
pub fn extract_ruby(document: &Document, source: &str, options: &ExtractOptions) -> String {
    let tags = erb_nodes(document);

    if !options.preserve_positions {
        return tags
            .iter()
            .filter_map(|erb| statement(erb, options))
            .filter(|code| !code.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
    }

    let mut keep: Vec<(Span, &str)> = Vec::new();
    for erb in tags {
        match erb.kind {
            ErbKind::Comment if !options.comments => continue,
            ErbKind::Comment => {
                // From the `#` of `<%#` through the comment text.
                let hash = erb.span.start + erb.tag_opening.len().saturating_sub(1);
                let span = Span::new(hash, erb.content_span.end);
                if let Some(text) = source.get(span.start..span.end) {
                    keep.push((span, text));
                }
            }
            ErbKind::Statement | ErbKind::Output => {
                let span = erb.content_span;
                if let Some(text) = source.get(span.start..span.end) {
                    keep.push((span, text));
                }
                if options.semicolons && erb.tag_closing.is_some() {
                    keep.push((Span::new(span.end, span.end + 1), ";"));
                }
            }
        }
    }

    overlay(source, &keep)
}

fn statement(erb: &ErbNode, options: &ExtractOptions) -> Option<String> {
    let code = erb.content.trim();
    match erb.kind {
        ErbKind::Comment if !options.comments => None,
        ErbKind::Comment if code.is_empty() => None,
        ErbKind::Comment => Some(format!("# {code}")),
        ErbKind::Statement | ErbKind::Output => Some(code.to_string()),
    }
}
