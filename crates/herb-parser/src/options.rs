use serde::{Deserialize, Serialize};

/// Parser configuration.
///
/// Deserializable from any serde format; missing keys take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Keep whitespace inside tags as `Whitespace` nodes.
    pub track_whitespace: bool,
    /// Rewrite ERB control-flow tag sequences into structured nodes.
    pub analyze: bool,
    /// When false, unclosed elements with an optional end tag (`<p>`, `<li>`, ...)
    /// are reported as warnings instead of errors.
    pub strict: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            track_whitespace: false,
            analyze: true,
            strict: true,
        }
    }
}

impl ParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_whitespace(mut self, track_whitespace: bool) -> Self {
        self.track_whitespace = track_whitespace;
        self
    }

    pub fn analyze(mut self, analyze: bool) -> Self {
        self.analyze = analyze;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// HTML elements whose end tag may be omitted.
pub const OPTIONAL_END_TAG_ELEMENTS: &[&str] = &[
    "p", "li", "dt", "dd", "option", "optgroup", "tr", "td", "th", "thead", "tbody", "tfoot",
    "colgroup", "rb", "rt", "rp", "caption",
];

pub fn has_optional_end_tag(tag: &str) -> bool {
    OPTIONAL_END_TAG_ELEMENTS
        .iter()
        .any(|optional| optional.eq_ignore_ascii_case(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let options = ParserOptions::default();
        assert!(!options.track_whitespace);
        assert!(options.analyze);
        assert!(options.strict);
    }

    #[test]
    fn test_builder() {
        let options = ParserOptions::new().track_whitespace(true).analyze(false);
        assert_eq!(
            options,
            ParserOptions {
                track_whitespace: true,
                analyze: false,
                strict: true,
            }
        );
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let options: ParserOptions = toml::from_str("track_whitespace = true").unwrap();
        assert!(options.track_whitespace);
        assert!(options.analyze);
        assert!(options.strict);
    }

    #[test]
    fn test_deserialize_full_toml() {
        let options: ParserOptions =
            toml::from_str("track_whitespace = false\nanalyze = false\nstrict = false").unwrap();
        assert_eq!(options, ParserOptions::new().analyze(false).strict(false));
    }

    #[test]
    fn test_optional_end_tags() {
        assert!(has_optional_end_tag("li"));
        assert!(has_optional_end_tag("P"));
        assert!(!has_optional_end_tag("div"));
    }
}
