//! Document parser for HTML+ERB.
//!
//! Parses the token stream from `herb-lexer` into a `Document` tree using
//! recursive descent. The parser never stops at the first problem: every
//! malformed construct is recorded as a `ParseError` and parsing resumes at
//! the next token that can start a construct.
//!
//! Element nesting is tracked with a stack of open tag names. A close tag
//! that matches an enclosing element ends every element opened inside it
//! (each of those reports `UnclosedElement`); a close tag that matches
//! nothing is kept in the tree as a stray `CloseTag` node.

use crate::analyzer;
use crate::ast::{
    Attribute, AttributeValue, CloseTag, Comment, Doctype, Document, Element, ErbKind, ErbNode,
    Node, OpenTag, Text, Whitespace,
};
use crate::options::{has_optional_end_tag, ParserOptions};
use crate::{ParseError, ParseErrorKind, ParseResult, Severity, MAX_NESTING_DEPTH};
use herb_lexer::{is_void_element, Location, Position, Scanner, Span, Token, TokenKind};
use tracing::debug;

/// HTML+ERB document parser.
pub struct Parser<'src> {
    tokens: Vec<Token<'src>>,
    pos: usize,
    options: ParserOptions,
    errors: Vec<ParseError>,
    /// Lowercased names of the elements currently being parsed, outermost first.
    open_elements: Vec<String>,
    eof: Token<'src>,
}

impl<'src> Parser<'src> {
    /// Create a new parser for the given tokens of `source`.
    pub fn new(source: &'src str, tokens: Vec<Token<'src>>, options: ParserOptions) -> Self {
        let eof = tokens
            .last()
            .filter(|token| token.kind == TokenKind::Eof)
            .copied()
            .unwrap_or_else(|| {
                let end = tokens
                    .last()
                    .map_or(Position::default(), |token| token.location.end);
                Token::new(
                    TokenKind::Eof,
                    "",
                    Span::new(source.len(), source.len()),
                    Location::new(end, end),
                )
            });

        Self {
            tokens,
            pos: 0,
            options,
            errors: Vec::new(),
            open_elements: Vec::new(),
            eof,
        }
    }

    /// Parse source code with default options.
    pub fn parse(source: &str) -> ParseResult {
        Self::parse_with_options(source, ParserOptions::default())
    }

    /// Lex, parse and (when `options.analyze` is set) analyze `source`.
    pub fn parse_with_options(source: &str, options: ParserOptions) -> ParseResult {
        let tokens = Scanner::tokenize(source);
        let mut parser = Parser::new(source, tokens, options);
        let mut document = parser.parse_document();

        if options.analyze {
            document = analyzer::analyze(document);
        }

        ParseResult {
            document,
            errors: parser.errors,
            options,
        }
    }

    /// Parse the whole token stream.
    pub fn parse_document(&mut self) -> Document {
        let children = self.parse_children();

        Document {
            children,
            span: Span::new(0, self.eof.span.end),
            location: Location::new(Position::default(), self.eof.location.end),
        }
    }

    /// The errors recovered so far, in detection order.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Parse content until EOF or a close tag that belongs to an open element.
    fn parse_children(&mut self) -> Vec<Node> {
        let mut children = Vec::new();

        loop {
            let token = *self.peek();
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::HtmlTagStartClose => {
                    let name = self.peek_close_tag_name();
                    if self.open_elements.iter().any(|open| *open == name) {
                        break;
                    }
                    children.push(self.parse_stray_close_tag());
                }
                TokenKind::HtmlTagStart => children.push(self.parse_element()),
                TokenKind::HtmlCommentStart => children.push(self.parse_comment()),
                TokenKind::HtmlDoctype => children.push(self.parse_doctype()),
                kind if kind.is_erb_start() => children.push(Node::Erb(self.parse_erb())),
                _ => children.push(self.parse_text()),
            }
        }

        children
    }

    /// Merge consecutive text-like tokens into one `Text` node.
    fn parse_text(&mut self) -> Node {
        let start = *self.peek();
        let mut content = String::new();
        let mut errors = Vec::new();

        while !starts_content_construct(self.peek().kind) {
            let token = self.advance();
            if token.kind == TokenKind::Error {
                errors.push(self.report_at(ParseErrorKind::InvalidCharacter, &token));
            }
            content.push_str(token.value);
        }

        let (span, location) = self.bounds_from(&start);
        Node::Text(Text {
            content,
            span,
            location,
            errors,
        })
    }

    // =========================================================================
    // Elements
    // =========================================================================

    fn parse_element(&mut self) -> Node {
        let open_tag = self.parse_open_tag();
        let tag_name = open_tag.tag_name.clone();

        if is_void_element(&tag_name) || open_tag.self_closing {
            return Node::Element(Element {
                is_void: is_void_element(&tag_name),
                span: open_tag.span,
                location: open_tag.location,
                tag_name,
                open_tag,
                children: Vec::new(),
                close_tag: None,
                errors: Vec::new(),
            });
        }

        if self.open_elements.len() >= MAX_NESTING_DEPTH {
            let error = self.report(
                ParseErrorKind::NestingTooDeep {
                    tag: tag_name.clone(),
                    depth: MAX_NESTING_DEPTH,
                },
                open_tag.span,
                open_tag.location,
                Severity::Error,
            );
            return Node::Element(Element {
                is_void: false,
                span: open_tag.span,
                location: open_tag.location,
                tag_name,
                open_tag,
                children: Vec::new(),
                close_tag: None,
                errors: vec![error],
            });
        }

        let name = tag_name.to_ascii_lowercase();
        self.open_elements.push(name.clone());
        let children = self.parse_children();
        self.open_elements.pop();

        let mut errors = Vec::new();
        let close_tag = if self.peek().kind == TokenKind::HtmlTagStartClose
            && self.peek_close_tag_name() == name
        {
            Some(self.parse_close_tag())
        } else {
            let severity = if !self.options.strict && has_optional_end_tag(&name) {
                Severity::Warning
            } else {
                Severity::Error
            };
            errors.push(self.report(
                ParseErrorKind::UnclosedElement {
                    tag: tag_name.clone(),
                },
                open_tag.span,
                open_tag.location,
                severity,
            ));
            None
        };

        let (end_span, end_location) = match (&close_tag, children.last()) {
            (Some(close), _) => (close.span, close.location),
            (None, Some(last)) => (last.span(), last.location()),
            (None, None) => (open_tag.span, open_tag.location),
        };

        Node::Element(Element {
            tag_name,
            span: open_tag.span.cover(end_span),
            location: open_tag.location.to(end_location),
            open_tag,
            children,
            close_tag,
            is_void: false,
            errors,
        })
    }

    /// Parse `<name attributes... >` or `/>`.
    fn parse_open_tag(&mut self) -> OpenTag {
        let start = self.advance();
        let tag_name = self.eat_identifier().unwrap_or_default();
        let mut children = Vec::new();
        let mut errors = Vec::new();
        let mut self_closing = false;

        loop {
            let token = *self.peek();
            match token.kind {
                TokenKind::HtmlTagEnd => {
                    self.advance();
                    break;
                }
                TokenKind::HtmlTagSelfClose => {
                    self.advance();
                    self_closing = true;
                    break;
                }
                TokenKind::Whitespace | TokenKind::Newline => self.parse_whitespace(&mut children),
                TokenKind::Identifier => children.push(Node::Attribute(self.parse_attribute())),
                TokenKind::Equals | TokenKind::Quote => {
                    children.push(Node::Attribute(self.parse_nameless_attribute()));
                }
                kind if kind.is_erb_start() => children.push(Node::Erb(self.parse_erb())),
                kind if ends_unterminated_tag(kind) => {
                    errors.push(self.report_at(
                        ParseErrorKind::MissingTagEnd {
                            tag: tag_name.clone(),
                        },
                        &start,
                    ));
                    break;
                }
                _ => {
                    self.advance();
                    let kind = if token.kind == TokenKind::Error {
                        ParseErrorKind::InvalidCharacter
                    } else {
                        ParseErrorKind::UnexpectedToken { found: token.kind }
                    };
                    errors.push(self.report_at(kind, &token));
                }
            }
        }

        let (span, location) = self.bounds_from(&start);
        OpenTag {
            tag_name,
            children,
            self_closing,
            span,
            location,
            errors,
        }
    }

    /// Parse `</name>`. The caller has checked the current token is `</`.
    fn parse_close_tag(&mut self) -> CloseTag {
        let start = self.advance();
        let tag_name = self.eat_identifier().unwrap_or_default();
        let mut children = Vec::new();
        let mut errors = Vec::new();

        loop {
            let token = *self.peek();
            match token.kind {
                TokenKind::HtmlTagEnd => {
                    self.advance();
                    break;
                }
                // `</div/>`: the lexer has already left the tag.
                TokenKind::HtmlTagSelfClose => {
                    self.advance();
                    errors.push(
                        self.report_at(ParseErrorKind::UnexpectedToken { found: token.kind }, &token),
                    );
                    break;
                }
                TokenKind::Whitespace | TokenKind::Newline => self.parse_whitespace(&mut children),
                kind if ends_unterminated_tag(kind) => {
                    errors.push(self.report_at(
                        ParseErrorKind::MissingTagEnd {
                            tag: format!("/{tag_name}"),
                        },
                        &start,
                    ));
                    break;
                }
                _ => {
                    self.advance();
                    errors.push(
                        self.report_at(ParseErrorKind::UnexpectedToken { found: token.kind }, &token),
                    );
                }
            }
        }

        let (span, location) = self.bounds_from(&start);
        CloseTag {
            tag_name,
            children,
            span,
            location,
            errors,
        }
    }

    /// A close tag that no open element accepts.
    fn parse_stray_close_tag(&mut self) -> Node {
        let mut close_tag = self.parse_close_tag();
        let found = close_tag.tag_name.clone();

        let kind = if is_void_element(&found) {
            ParseErrorKind::VoidElementClosingTag { tag: found }
        } else if let Some(expected) = self.open_elements.last() {
            ParseErrorKind::MismatchedClosingTag {
                expected: expected.clone(),
                found,
            }
        } else {
            ParseErrorKind::UnexpectedClosingTag { tag: found }
        };

        let error = self.report(kind, close_tag.span, close_tag.location, Severity::Error);
        close_tag.errors.push(error);
        Node::CloseTag(close_tag)
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    fn parse_attribute(&mut self) -> Attribute {
        let start = self.advance();
        let name = start.value.to_string();
        let mut children = Vec::new();
        let mut errors = Vec::new();

        if self.peek_past_whitespace().kind != TokenKind::Equals {
            return Attribute {
                name,
                equals: false,
                value: None,
                children,
                span: start.span,
                location: start.location,
                errors,
            };
        }

        self.parse_whitespace_run(&mut children);
        self.advance();
        let value = self.parse_value_after_equals(&name, &mut children, &mut errors);

        let (span, location) = self.bounds_from(&start);
        Attribute {
            name,
            equals: true,
            value,
            children,
            span,
            location,
            errors,
        }
    }

    /// `="value"` or `"value"` with no attribute name in front.
    fn parse_nameless_attribute(&mut self) -> Attribute {
        let start = *self.peek();
        let mut children = Vec::new();
        let mut errors = vec![self.report_at(ParseErrorKind::MissingAttributeName, &start)];

        let equals = start.kind == TokenKind::Equals;
        let value = if equals {
            self.advance();
            self.parse_value_after_equals("", &mut children, &mut errors)
        } else {
            Some(self.parse_attribute_value(&mut errors))
        };

        let (span, location) = self.bounds_from(&start);
        Attribute {
            name: String::new(),
            equals,
            value,
            children,
            span,
            location,
            errors,
        }
    }

    fn parse_value_after_equals(
        &mut self,
        name: &str,
        children: &mut Vec<Node>,
        errors: &mut Vec<ParseError>,
    ) -> Option<AttributeValue> {
        if starts_attribute_value(self.peek_past_whitespace().kind) {
            self.parse_whitespace_run(children);
            Some(self.parse_attribute_value(errors))
        } else {
            let token = *self.peek();
            errors.push(self.report_at(
                ParseErrorKind::MissingAttributeValue {
                    name: name.to_string(),
                },
                &token,
            ));
            None
        }
    }

    /// Parse a quoted value, a bare value or a lone ERB tag.
    fn parse_attribute_value(&mut self, errors: &mut Vec<ParseError>) -> AttributeValue {
        let start = *self.peek();
        let mut children = Vec::new();
        let mut quote = None;

        match start.kind {
            TokenKind::Quote => {
                self.advance();
                quote = start.value.chars().next();
                let mut closed = false;

                loop {
                    let token = *self.peek();
                    match token.kind {
                        TokenKind::Quote => {
                            self.advance();
                            closed = true;
                            break;
                        }
                        TokenKind::Text => {
                            self.advance();
                            children.push(text_node(&token, Vec::new()));
                        }
                        TokenKind::Error if !token.span.is_empty() => {
                            self.advance();
                            let error = self.report_at(ParseErrorKind::InvalidCharacter, &token);
                            children.push(text_node(&token, vec![error]));
                        }
                        kind if kind.is_erb_start() => children.push(Node::Erb(self.parse_erb())),
                        _ => {
                            self.eat_boundary();
                            break;
                        }
                    }
                }

                if !closed {
                    errors.push(self.report_at(
                        ParseErrorKind::UnclosedQuote {
                            quote: quote.unwrap_or('"'),
                        },
                        &start,
                    ));
                }
            }
            TokenKind::Identifier => {
                self.advance();
                children.push(text_node(&start, Vec::new()));
            }
            _ => children.push(Node::Erb(self.parse_erb())),
        }

        let (span, location) = self.bounds_from(&start);
        AttributeValue {
            quote,
            children,
            span,
            location,
        }
    }

    // =========================================================================
    // Comments, doctype, ERB
    // =========================================================================

    fn parse_comment(&mut self) -> Node {
        let start = self.advance();
        let mut children = Vec::new();
        let mut errors = Vec::new();
        let mut closed = false;

        loop {
            let token = *self.peek();
            match token.kind {
                TokenKind::HtmlCommentEnd => {
                    self.advance();
                    closed = true;
                    break;
                }
                TokenKind::Text => {
                    self.advance();
                    children.push(text_node(&token, Vec::new()));
                }
                TokenKind::Error if !token.span.is_empty() => {
                    self.advance();
                    let error = self.report_at(ParseErrorKind::InvalidCharacter, &token);
                    children.push(text_node(&token, vec![error]));
                }
                kind if kind.is_erb_start() => children.push(Node::Erb(self.parse_erb())),
                _ => {
                    self.eat_boundary();
                    break;
                }
            }
        }

        if !closed {
            errors.push(self.report_at(ParseErrorKind::UnclosedComment, &start));
        }

        let (span, location) = self.bounds_from(&start);
        Node::Comment(Comment {
            children,
            closed,
            span,
            location,
            errors,
        })
    }

    fn parse_doctype(&mut self) -> Node {
        let start = self.advance();
        let mut content = String::new();
        let mut errors = Vec::new();

        loop {
            let kind = self.peek().kind;
            if matches!(kind, TokenKind::HtmlTagEnd | TokenKind::HtmlTagSelfClose) {
                self.advance();
                break;
            }
            if ends_unterminated_tag(kind) {
                errors.push(self.report_at(
                    ParseErrorKind::MissingTagEnd {
                        tag: start.value.to_string(),
                    },
                    &start,
                ));
                break;
            }
            content.push_str(self.advance().value);
        }

        let (span, location) = self.bounds_from(&start);
        Node::Doctype(Doctype {
            content,
            span,
            location,
            errors,
        })
    }

    /// Parse `<% content %>`. The current token must be an ERB start.
    fn parse_erb(&mut self) -> ErbNode {
        let opening = self.advance();
        let kind = match opening.kind {
            TokenKind::ErbOutputStart => ErbKind::Output,
            TokenKind::ErbCommentStart => ErbKind::Comment,
            _ => ErbKind::Statement,
        };

        let (content, content_span) = if self.peek().kind == TokenKind::ErbContent {
            let token = self.advance();
            (token.value.to_string(), token.span)
        } else {
            (String::new(), Span::new(opening.span.end, opening.span.end))
        };

        let mut errors = Vec::new();
        let tag_closing = if self.peek().kind == TokenKind::ErbEnd {
            Some(self.advance().value.to_string())
        } else {
            self.eat_boundary();
            errors.push(self.report_at(ParseErrorKind::UnclosedErbTag, &opening));
            None
        };

        let (span, location) = self.bounds_from(&opening);
        ErbNode {
            kind,
            tag_opening: opening.value.to_string(),
            content,
            tag_closing,
            content_span,
            span,
            location,
            errors,
        }
    }

    fn parse_whitespace_run(&mut self, children: &mut Vec<Node>) {
        while self.peek().kind.is_whitespace() {
            self.parse_whitespace(children);
        }
    }

    fn parse_whitespace(&mut self, children: &mut Vec<Node>) {
        let token = self.advance();
        if self.options.track_whitespace {
            children.push(Node::Whitespace(Whitespace {
                value: token.value.to_string(),
                span: token.span,
                location: token.location,
            }));
        }
    }

    // =========================================================================
    // Token navigation helpers
    // =========================================================================

    fn peek(&self) -> &Token<'src> {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    /// Consume the current token and return it. Never moves past EOF.
    fn advance(&mut self) -> Token<'src> {
        let token = *self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    /// The last consumed token, or EOF before anything was consumed.
    fn previous(&self) -> &Token<'src> {
        self.pos
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .unwrap_or(&self.eof)
    }

    fn peek_past_whitespace(&self) -> &Token<'src> {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .find(|token| !token.kind.is_whitespace())
            .unwrap_or(&self.eof)
    }

    fn eat_identifier(&mut self) -> Option<String> {
        (self.peek().kind == TokenKind::Identifier).then(|| self.advance().value.to_string())
    }

    /// Consume the zero-width error token the lexer emits where an
    /// unterminated construct meets the end of input.
    fn eat_boundary(&mut self) {
        let token = self.peek();
        if token.kind == TokenKind::Error && token.span.is_empty() {
            self.advance();
        }
    }

    /// Lowercased name after a `</` token, or "" when there is none.
    fn peek_close_tag_name(&self) -> String {
        self.tokens
            .get(self.pos + 1)
            .filter(|token| token.kind == TokenKind::Identifier)
            .map(|token| token.value.to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Span and location from `start` to the last consumed token.
    fn bounds_from(&self, start: &Token<'src>) -> (Span, Location) {
        let end = self.previous();
        if end.span.end < start.span.start {
            return (
                Span::new(start.span.start, start.span.start),
                Location::new(start.location.start, start.location.start),
            );
        }
        (
            Span::new(start.span.start, end.span.end),
            start.location.to(end.location),
        )
    }

    fn report_at(&mut self, kind: ParseErrorKind, token: &Token<'src>) -> ParseError {
        self.report(kind, token.span, token.location, Severity::Error)
    }

    /// Record an error and return a copy for the node it belongs to.
    fn report(
        &mut self,
        kind: ParseErrorKind,
        span: Span,
        location: Location,
        severity: Severity,
    ) -> ParseError {
        debug!(
            error = kind.name(),
            %severity,
            line = location.start.line,
            column = location.start.column,
            "recovered from parse error"
        );
        let error = ParseError::new(kind, span, location, severity);
        self.errors.push(error.clone());
        error
    }
}

/// Tokens that begin a construct of their own in content.
fn starts_content_construct(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Eof
            | TokenKind::HtmlTagStart
            | TokenKind::HtmlTagStartClose
            | TokenKind::HtmlCommentStart
            | TokenKind::HtmlDoctype
    ) || kind.is_erb_start()
}

/// Tokens that cannot appear inside a tag. The lexer only produces `Text`
/// there after leaving the tag at a `<`.
fn ends_unterminated_tag(kind: TokenKind) -> bool {
    kind == TokenKind::Text || starts_content_construct(kind)
}

fn starts_attribute_value(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Quote | TokenKind::Identifier) || kind.is_erb_start()
}

fn text_node(token: &Token<'_>, errors: Vec<ParseError>) -> Node {
    Node::Text(Text {
        content: token.value.to_string(),
        span: token.span,
        location: token.location,
        errors,
    })
}
