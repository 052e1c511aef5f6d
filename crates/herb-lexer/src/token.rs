use std::fmt;

/// A byte range in source text. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// A line/column pair. Lines and columns are 1-based; columns count chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Start and end positions of a token or node, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Location running from the start of `self` to the end of `other`.
    pub fn to(self, other: Location) -> Location {
        Location::new(self.start, other.end)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})-({})", self.start, self.end)
    }
}

/// Token classification for HTML+ERB source.
///
/// Kinds carry no data: the lexeme is always available as [`Token::value`],
/// a slice of the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Markup structure
    HtmlTagStart,      // <
    HtmlTagStartClose, // </
    HtmlTagEnd,        // >
    HtmlTagSelfClose,  // />
    HtmlCommentStart,  // <!--
    HtmlCommentEnd,    // -->
    HtmlDoctype,       // <!DOCTYPE

    // Inside tags
    Identifier,
    Equals,
    Quote,
    Slash,

    // Literal text runs
    Text,

    // Embedded Ruby
    ErbStart,        // <% <%-
    ErbOutputStart,  // <%= <%==
    ErbCommentStart, // <%#
    ErbContent,
    ErbEnd, // %> -%> =%>

    Whitespace,
    Newline,

    Error,
    Eof,
}

impl TokenKind {
    /// Stable name used by the token dump.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::HtmlTagStart => "TOKEN_HTML_TAG_START",
            TokenKind::HtmlTagStartClose => "TOKEN_HTML_TAG_START_CLOSE",
            TokenKind::HtmlTagEnd => "TOKEN_HTML_TAG_END",
            TokenKind::HtmlTagSelfClose => "TOKEN_HTML_TAG_SELF_CLOSE",
            TokenKind::HtmlCommentStart => "TOKEN_HTML_COMMENT_START",
            TokenKind::HtmlCommentEnd => "TOKEN_HTML_COMMENT_END",
            TokenKind::HtmlDoctype => "TOKEN_HTML_DOCTYPE",
            TokenKind::Identifier => "TOKEN_IDENTIFIER",
            TokenKind::Equals => "TOKEN_EQUALS",
            TokenKind::Quote => "TOKEN_QUOTE",
            TokenKind::Slash => "TOKEN_SLASH",
            TokenKind::Text => "TOKEN_TEXT",
            TokenKind::ErbStart => "TOKEN_ERB_START",
            TokenKind::ErbOutputStart => "TOKEN_ERB_OUTPUT_START",
            TokenKind::ErbCommentStart => "TOKEN_ERB_COMMENT_START",
            TokenKind::ErbContent => "TOKEN_ERB_CONTENT",
            TokenKind::ErbEnd => "TOKEN_ERB_END",
            TokenKind::Whitespace => "TOKEN_WHITESPACE",
            TokenKind::Newline => "TOKEN_NEWLINE",
            TokenKind::Error => "TOKEN_ERROR",
            TokenKind::Eof => "TOKEN_EOF",
        }
    }

    /// Any of the three ERB opening delimiters.
    pub fn is_erb_start(self) -> bool {
        matches!(
            self,
            TokenKind::ErbStart | TokenKind::ErbOutputStart | TokenKind::ErbCommentStart
        )
    }

    pub fn is_whitespace(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Newline)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A token produced by the lexer. `value` borrows from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub value: &'src str,
    pub span: Span,
    pub location: Location,
}

impl<'src> Token<'src> {
    pub fn new(kind: TokenKind, value: &'src str, span: Span, location: Location) -> Self {
        Self {
            kind,
            value,
            span,
            location,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} [{}..{}] {}",
            self.kind, self.value, self.span.start, self.span.end, self.location
        )
    }
}

/// HTML5 void elements (self-closing, no children).
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Check if a tag name is an HTML5 void element.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

/// Elements whose content is raw text: markup inside them is not tokenized.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub fn is_raw_text_element(tag: &str) -> bool {
    raw_text_element(tag).is_some()
}

/// The lowercase table entry for `tag` if it is a raw-text element.
pub fn raw_text_element(tag: &str) -> Option<&'static str> {
    RAW_TEXT_ELEMENTS
        .iter()
        .copied()
        .find(|raw| raw.eq_ignore_ascii_case(tag))
}
