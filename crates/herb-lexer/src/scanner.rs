use crate::token::{raw_text_element, Location, Position, Span, Token, TokenKind};
use crate::{LexResult, LexerError};
use tracing::trace;

/// Scanner mode determines which lexical rules apply at the current position.
///
/// Modes live on a stack: entering a tag, a quoted value, a comment, raw text
/// or an ERB tag pushes a mode, leaving it pops back to whatever was below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerMode {
    /// Element content: text, whitespace and the start of any construct.
    Data,
    /// Inside `<tag ...>`, `</tag ...>` or `<!DOCTYPE ...>`.
    Tag,
    /// Inside a quoted attribute value; carries the quote character.
    AttributeValue(char),
    /// Inside `<!-- ... -->`.
    Comment,
    /// Content of `<script>` / `<style>`; carries the lowercase tag name.
    RawText(&'static str),
    /// Between an ERB opening delimiter and `%>`.
    Erb,
}

/// HTML+ERB source scanner.
///
/// Converts source text into a flat token stream in a single forward pass.
/// Scanning is total: malformed input produces `Error` tokens and
/// [`LexerError`] diagnostics, never a failure.
///
/// - `&str` source with a byte cursor, so token values are source slices
/// - Explicit mode stack instead of ad hoc flags
/// - Position tracking on every token
pub struct Scanner<'src> {
    source: &'src str,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token<'src>>,
    errors: Vec<LexerError>,
    modes: Vec<ScannerMode>,
    /// Set while scanning a `<script>` or `<style>` start tag, so raw text begins after its `>`.
    raw_text_tag: Option<&'static str>,
}

impl<'src> Scanner<'src> {
    /// Create a new scanner for the given source.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
            modes: vec![ScannerMode::Data],
            raw_text_tag: None,
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(source: &'src str) -> Vec<Token<'src>> {
        Self::lex(source).tokens
    }

    /// Tokenize the entire source, keeping the lexer diagnostics.
    pub fn lex(source: &'src str) -> LexResult<'src> {
        let mut scanner = Scanner::new(source);
        scanner.scan_tokens();
        LexResult {
            tokens: scanner.tokens,
            errors: scanner.errors,
        }
    }

    /// Scan all tokens from the source.
    fn scan_tokens(&mut self) {
        while !self.is_at_end() {
            self.scan_token();
        }

        self.close_pending_modes();

        let position = self.position();
        self.emit(TokenKind::Eof, self.pos, position);
    }

    /// Scan the next token according to the current mode.
    fn scan_token(&mut self) {
        match self.mode() {
            ScannerMode::Data => self.scan_data(),
            ScannerMode::Tag => self.scan_tag(),
            ScannerMode::AttributeValue(quote) => self.scan_attribute_value(quote),
            ScannerMode::Comment => self.scan_comment(),
            ScannerMode::RawText(tag) => self.scan_raw_text(tag),
            ScannerMode::Erb => self.scan_erb_content(),
        }
    }

    // --- Modes ---

    fn mode(&self) -> ScannerMode {
        self.modes.last().copied().unwrap_or(ScannerMode::Data)
    }

    fn push_mode(&mut self, mode: ScannerMode) {
        trace!(?mode, offset = self.pos, "enter scanner mode");
        self.modes.push(mode);
    }

    fn pop_mode(&mut self) {
        // Data is the floor of the stack.
        if self.modes.len() > 1 {
            let mode = self.modes.pop();
            trace!(?mode, offset = self.pos, "leave scanner mode");
        }
    }

    /// Emit synthetic boundaries for constructs still open at end of input.
    fn close_pending_modes(&mut self) {
        while self.modes.len() > 1 {
            let message = match self.mode() {
                ScannerMode::AttributeValue(quote) => {
                    Some(format!("Unterminated attribute value, expected closing {quote}"))
                }
                ScannerMode::Comment => Some("Unterminated comment, expected '-->'".to_string()),
                ScannerMode::Erb => Some("Unterminated ERB tag, expected '%>'".to_string()),
                // Unclosed tags and raw text are structural, the parser reports them.
                ScannerMode::Tag | ScannerMode::RawText(_) | ScannerMode::Data => None,
            };

            if let Some(message) = message {
                self.error_boundary(message);
            }
            self.pop_mode();
        }
    }

    // --- Scanners ---

    /// Scan element content.
    fn scan_data(&mut self) {
        let Some(ch) = self.peek() else { return };

        match ch {
            '<' if self.starts_erb() => self.scan_erb_start(),
            '<' if self.starts_with("<!--") => {
                self.emit_fixed(TokenKind::HtmlCommentStart, 4);
                self.push_mode(ScannerMode::Comment);
            }
            '<' if self.starts_with_ignore_case("<!doctype") => {
                self.emit_fixed(TokenKind::HtmlDoctype, 9);
                self.push_mode(ScannerMode::Tag);
            }
            '<' if self.peek_next() == Some('/') && self.peek_nth(2).is_some_and(is_tag_name_start) => {
                self.emit_fixed(TokenKind::HtmlTagStartClose, 2);
                self.raw_text_tag = None;
                self.push_mode(ScannerMode::Tag);
            }
            '<' if self.peek_next().is_some_and(is_tag_name_start) => {
                self.emit_fixed(TokenKind::HtmlTagStart, 1);
                self.raw_text_tag = None;
                self.push_mode(ScannerMode::Tag);
            }
            ' ' | '\t' => self.scan_whitespace(),
            '\n' | '\r' => self.scan_newline(),
            '\0' => self.scan_invalid_character(),
            _ => self.scan_text(|scanner| {
                !matches!(scanner.peek(), Some(' ' | '\t' | '\n' | '\r' | '\0'))
                    && !scanner.starts_markup()
            }),
        }
    }

    /// Scan inside a start tag, end tag or doctype.
    fn scan_tag(&mut self) {
        let Some(ch) = self.peek() else { return };

        match ch {
            '<' if self.starts_erb() => self.scan_erb_start(),
            ' ' | '\t' => self.scan_whitespace(),
            '\n' | '\r' => self.scan_newline(),
            '>' => {
                self.emit_fixed(TokenKind::HtmlTagEnd, 1);
                self.pop_mode();
                if let Some(tag) = self.raw_text_tag.take() {
                    self.push_mode(ScannerMode::RawText(tag));
                }
            }
            '/' if self.peek_next() == Some('>') => {
                self.emit_fixed(TokenKind::HtmlTagSelfClose, 2);
                self.raw_text_tag = None;
                self.pop_mode();
            }
            '/' if !self.peek_next().is_some_and(is_identifier_char) => {
                self.emit_fixed(TokenKind::Slash, 1);
            }
            '=' => self.emit_fixed(TokenKind::Equals, 1),
            '"' | '\'' => {
                self.emit_fixed(TokenKind::Quote, 1);
                self.push_mode(ScannerMode::AttributeValue(ch));
            }
            '<' => {
                // A new construct starts before this tag was closed with `>`.
                // Leave it to Data mode; the parser reports the missing `>`.
                self.raw_text_tag = None;
                self.pop_mode();
            }
            '\0' => self.scan_invalid_character(),
            _ => self.scan_identifier(),
        }
    }

    /// Scan a tag name, attribute name or bare attribute value.
    fn scan_identifier(&mut self) {
        let start = self.pos;
        let start_position = self.position();

        self.advance();
        while self.peek().is_some_and(is_identifier_char) {
            if self.starts_with("/>") {
                break;
            }
            self.advance();
        }

        if self
            .tokens
            .last()
            .is_some_and(|token| token.kind == TokenKind::HtmlTagStart)
        {
            self.raw_text_tag = raw_text_element(&self.source[start..self.pos]);
        }

        self.emit(TokenKind::Identifier, start, start_position);
    }

    /// Scan inside a quoted attribute value.
    fn scan_attribute_value(&mut self, quote: char) {
        let Some(ch) = self.peek() else { return };

        match ch {
            '<' if self.starts_erb() => self.scan_erb_start(),
            c if c == quote => {
                self.emit_fixed(TokenKind::Quote, 1);
                self.pop_mode();
            }
            '\0' => self.scan_invalid_character(),
            _ => self.scan_text(|scanner| {
                !matches!(scanner.peek(), Some(c) if c == quote || c == '\0')
                    && !scanner.starts_erb()
            }),
        }
    }

    /// Scan the body of an HTML comment.
    fn scan_comment(&mut self) {
        let Some(ch) = self.peek() else { return };

        match ch {
            '<' if self.starts_erb() => self.scan_erb_start(),
            '-' if self.starts_with("-->") => {
                self.emit_fixed(TokenKind::HtmlCommentEnd, 3);
                self.pop_mode();
            }
            '\0' => self.scan_invalid_character(),
            _ => self.scan_text(|scanner| {
                scanner.peek() != Some('\0')
                    && !scanner.starts_with("-->")
                    && !scanner.starts_erb()
            }),
        }
    }

    /// Scan `<script>` / `<style>` content up to the matching end tag.
    fn scan_raw_text(&mut self, tag: &str) {
        let Some(ch) = self.peek() else { return };

        if self.starts_raw_text_end(tag) {
            self.pop_mode();
            return;
        }

        match ch {
            '<' if self.starts_erb() => self.scan_erb_start(),
            '\0' => self.scan_invalid_character(),
            _ => self.scan_text(|scanner| {
                scanner.peek() != Some('\0')
                    && !scanner.starts_erb()
                    && !scanner.starts_raw_text_end(tag)
            }),
        }
    }

    /// Scan an ERB opening delimiter and enter ERB mode.
    ///
    /// `<%==` and `<%=` emit output, `<%#` is a comment, `<%-` and `<%` are statements.
    fn scan_erb_start(&mut self) {
        let (kind, len) = if self.starts_with("<%==") {
            (TokenKind::ErbOutputStart, 4)
        } else if self.starts_with("<%=") {
            (TokenKind::ErbOutputStart, 3)
        } else if self.starts_with("<%#") {
            (TokenKind::ErbCommentStart, 3)
        } else if self.starts_with("<%-") {
            (TokenKind::ErbStart, 3)
        } else {
            (TokenKind::ErbStart, 2)
        };

        self.emit_fixed(kind, len);
        self.push_mode(ScannerMode::Erb);
    }

    /// Scan ERB content up to and including the closing delimiter.
    fn scan_erb_content(&mut self) {
        let rest = &self.source[self.pos..];

        let Some(close) = rest.find("%>") else {
            let start = self.pos;
            let start_position = self.position();
            self.advance_to(self.source.len());
            self.emit(TokenKind::ErbContent, start, start_position);
            // The boundary is emitted by `close_pending_modes`.
            return;
        };

        // `-%>` and `=%>` are closing variants; the marker belongs to the delimiter.
        let content_len = match rest[..close].chars().next_back() {
            Some('-' | '=') => close - 1,
            _ => close,
        };

        let start = self.pos;
        let start_position = self.position();
        self.advance_to(start + content_len);
        self.emit(TokenKind::ErbContent, start, start_position);

        let start = self.pos;
        let start_position = self.position();
        self.advance_to(start + (close - content_len) + 2);
        self.emit(TokenKind::ErbEnd, start, start_position);

        self.pop_mode();
    }

    fn scan_whitespace(&mut self) {
        let start = self.pos;
        let start_position = self.position();

        while matches!(self.peek(), Some(' ' | '\t')) {
            self.advance();
        }

        self.emit(TokenKind::Whitespace, start, start_position);
    }

    /// Scan one line break: `\n`, `\r\n` or a lone `\r`.
    fn scan_newline(&mut self) {
        let start = self.pos;
        let start_position = self.position();

        if self.starts_with("\r\n") {
            self.advance();
        }
        self.advance();

        self.emit(TokenKind::Newline, start, start_position);
    }

    /// Scan a run of text. The first char is always consumed.
    fn scan_text(&mut self, mut keep_going: impl FnMut(&Self) -> bool) {
        let start = self.pos;
        let start_position = self.position();

        self.advance();
        while !self.is_at_end() && keep_going(self) {
            self.advance();
        }

        self.emit(TokenKind::Text, start, start_position);
    }

    fn scan_invalid_character(&mut self) {
        let start = self.pos;
        let start_position = self.position();
        let ch = self.peek().unwrap_or_default();

        self.advance();
        self.errors.push(LexerError {
            message: format!("Unexpected character: {ch:?}"),
            span: Span::new(start, self.pos),
            line: start_position.line,
            column: start_position.column,
        });
        self.emit(TokenKind::Error, start, start_position);
    }

    // --- Lookahead ---

    /// `<%` that is not the `<%%` escape.
    fn starts_erb(&self) -> bool {
        self.starts_with("<%") && !self.starts_with("<%%")
    }

    /// Any `<` that opens a construct in Data mode.
    fn starts_markup(&self) -> bool {
        if self.peek() != Some('<') {
            return false;
        }

        self.starts_erb()
            || self.starts_with("<!--")
            || self.starts_with_ignore_case("<!doctype")
            || self.peek_next().is_some_and(is_tag_name_start)
            || (self.peek_next() == Some('/') && self.peek_nth(2).is_some_and(is_tag_name_start))
    }

    /// `</tag` followed by a char that cannot continue the tag name.
    fn starts_raw_text_end(&self, tag: &str) -> bool {
        let rest = &self.source[self.pos..];
        let Some(after_slash) = rest.strip_prefix("</") else {
            return false;
        };

        after_slash
            .get(..tag.len())
            .is_some_and(|name| name.eq_ignore_ascii_case(tag))
            && !after_slash[tag.len()..]
                .chars()
                .next()
                .is_some_and(is_identifier_char)
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.source[self.pos..].starts_with(prefix)
    }

    fn starts_with_ignore_case(&self, prefix: &str) -> bool {
        self.source[self.pos..]
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    }

    // --- Helpers ---

    fn emit(&mut self, kind: TokenKind, start: usize, start_position: Position) {
        let source = self.source;
        let span = Span::new(start, self.pos);
        let location = Location::new(start_position, self.position());
        self.tokens
            .push(Token::new(kind, &source[start..self.pos], span, location));
    }

    /// Emit a token for the next `len` bytes (all ASCII delimiters).
    fn emit_fixed(&mut self, kind: TokenKind, len: usize) {
        let start = self.pos;
        let start_position = self.position();
        self.advance_to(start + len);
        self.emit(kind, start, start_position);
    }

    /// Zero-width `Error` token marking where an unterminated construct was cut off.
    fn error_boundary(&mut self, message: String) {
        let position = self.position();
        self.errors.push(LexerError {
            message,
            span: Span::new(self.pos, self.pos),
            line: position.line,
            column: position.column,
        });
        self.emit(TokenKind::Error, self.pos, position);
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.peek_nth(1)
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn advance(&mut self) {
        let Some(ch) = self.peek() else { return };
        self.pos += ch.len_utf8();

        match ch {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            // `\r\n` counts as one line break, on its `\n`.
            '\r' if self.peek() != Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            _ => self.column += 1,
        }
    }

    /// Advance until the byte offset `target` (a char boundary) is reached.
    fn advance_to(&mut self, target: usize) {
        while self.pos < target && !self.is_at_end() {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}

fn is_tag_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic()
}

/// Chars allowed in tag names, attribute names and bare attribute values.
fn is_identifier_char(ch: char) -> bool {
    !ch.is_whitespace() && !matches!(ch, '"' | '\'' | '=' | '<' | '>' | '\0')
}
