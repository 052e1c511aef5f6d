//! ERB control-flow analysis.
//!
//! The parser leaves ERB tags flat: `<% if x %>a<% end %>` is three siblings.
//! The analyzer walks every sibling list and rewrites each well-formed
//! keyword sequence into one structured node that owns the nodes between
//! its tags. Each list is paired in one pass with a stack of open
//! constructs, so nested constructs pair by depth.
//!
//! A sequence that never reaches its `end`, or whose clauses are out of
//! order (`else` before `elsif`, `when` outside a `case`), stays flat, and
//! so does control flow nested past [`MAX_NESTING_DEPTH`].
//! Analysis never adds errors.

use crate::ast::{
    ClauseKind, Document, ErbBegin, ErbBlock, ErbCase, ErbClause, ErbIf, ErbKind, ErbLoop,
    ErbNode, ErbSubsequent, ErbUnless, LoopKind, Node,
};
use crate::MAX_NESTING_DEPTH;
use herb_lexer::{Location, Span};
use tracing::debug;

/// Rewrite ERB control flow throughout `document`.
pub fn analyze(document: Document) -> Document {
    Document {
        children: analyze_nodes(document.children, 0),
        ..document
    }
}

/// Analyze a sibling list sitting `depth` levels below the document.
fn analyze_nodes(nodes: Vec<Node>, depth: usize) -> Vec<Node> {
    let mut pairing = Pairing::new(depth);
    for node in nodes {
        let node = analyze_node(node, pairing.depth() + 1);
        pairing.push(node);
    }
    pairing.finish()
}

/// Element depth is capped by the parser, which bounds this recursion.
fn analyze_node(node: Node, depth: usize) -> Node {
    match node {
        Node::Element(mut element) => {
            element.open_tag.children =
                analyze_nodes(std::mem::take(&mut element.open_tag.children), depth);
            element.children = analyze_nodes(std::mem::take(&mut element.children), depth);
            Node::Element(element)
        }
        Node::Attribute(mut attribute) => {
            if let Some(value) = attribute.value.as_mut() {
                value.children = analyze_nodes(std::mem::take(&mut value.children), depth);
            }
            Node::Attribute(attribute)
        }
        other => other,
    }
}

// =========================================================================
// Keywords
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    If,
    Unless,
    Case,
    While,
    Until,
    For,
    Begin,
    Block,
    Elsif,
    Else,
    When,
    Rescue,
    Ensure,
    End,
}

impl Keyword {
    fn is_opener(self) -> bool {
        matches!(
            self,
            Keyword::If
                | Keyword::Unless
                | Keyword::Case
                | Keyword::While
                | Keyword::Until
                | Keyword::For
                | Keyword::Begin
                | Keyword::Block
        )
    }

    fn is_middle(self) -> bool {
        matches!(
            self,
            Keyword::Elsif | Keyword::Else | Keyword::When | Keyword::Rescue | Keyword::Ensure
        )
    }

    /// Where a middle keyword may appear under this opener: a stage number
    /// (clauses must come in non-decreasing stage order) and whether the
    /// stage may repeat.
    fn clause_stage(self, middle: Keyword) -> Option<(u8, bool)> {
        match (self, middle) {
            (Keyword::If, Keyword::Elsif) => Some((0, true)),
            (Keyword::If | Keyword::Unless | Keyword::Case, Keyword::Else) => Some((1, false)),
            (Keyword::Case, Keyword::When) => Some((0, true)),
            (Keyword::Begin, Keyword::Rescue) => Some((0, true)),
            (Keyword::Begin, Keyword::Else) => Some((1, false)),
            (Keyword::Begin, Keyword::Ensure) => Some((2, false)),
            _ => None,
        }
    }
}

/// Classify a statement tag by its leading Ruby keyword.
fn classify(erb: &ErbNode) -> Option<Keyword> {
    let content = erb.content.trim();
    let word = leading_word(content);

    if erb.kind == ErbKind::Comment {
        return None;
    }
    if erb.kind == ErbKind::Output {
        return opens_block(content).then_some(Keyword::Block);
    }

    let keyword = match word {
        "if" => Keyword::If,
        "unless" => Keyword::Unless,
        "case" => Keyword::Case,
        "while" => Keyword::While,
        "until" => Keyword::Until,
        "for" => Keyword::For,
        "begin" => Keyword::Begin,
        "elsif" => Keyword::Elsif,
        "else" => Keyword::Else,
        "when" => Keyword::When,
        "rescue" => Keyword::Rescue,
        "ensure" => Keyword::Ensure,
        "end" => Keyword::End,
        _ => return opens_block(content).then_some(Keyword::Block),
    };

    // `if x then y end` and friends close on the same line.
    if keyword.is_opener() && ends_with_word(content, "end") {
        return None;
    }

    Some(keyword)
}

fn leading_word(content: &str) -> &str {
    let end = content
        .find(|c: char| !is_word_char(c))
        .unwrap_or(content.len());
    &content[..end]
}

/// Text after the leading keyword.
fn argument(content: &str) -> String {
    let content = content.trim();
    content[leading_word(content).len()..].trim().to_string()
}

/// `foo do`, `foo do |x|` and `foo do |a, b|`.
fn opens_block(content: &str) -> bool {
    let mut head = content.trim_end();
    if let Some(without_bar) = head.strip_suffix('|') {
        if let Some(open) = without_bar.rfind('|') {
            head = without_bar[..open].trim_end();
        }
    }
    ends_with_word(head, "do")
}

fn ends_with_word(content: &str, word: &str) -> bool {
    content.strip_suffix(word).is_some_and(|before| {
        !before.chars().next_back().is_some_and(is_word_char)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// =========================================================================
// Matching
// =========================================================================

/// One keyword tag and the nodes up to the next clause or `end`.
struct Clause {
    keyword: Keyword,
    tag: ErbNode,
    body: Vec<Node>,
}

impl Clause {
    fn new(keyword: Keyword, tag: ErbNode) -> Self {
        Self {
            keyword,
            tag,
            body: Vec::new(),
        }
    }
}

/// An opener still waiting for its `end`.
struct Frame {
    opener: Clause,
    clauses: Vec<Clause>,
}

impl Frame {
    /// Body of the clause being filled.
    fn body_mut(&mut self) -> &mut Vec<Node> {
        match self.clauses.last_mut() {
            Some(clause) => &mut clause.body,
            None => &mut self.opener.body,
        }
    }

    fn clauses_in_order(&self) -> bool {
        let opener = self.opener.keyword;
        let mut previous: Option<(u8, bool)> = None;

        for clause in &self.clauses {
            let Some(stage) = opener.clause_stage(clause.keyword) else {
                return false;
            };
            if let Some((last, repeatable)) = previous {
                if stage.0 < last || (stage.0 == last && !repeatable) {
                    return false;
                }
            }
            previous = Some(stage);
        }

        // A `case` needs at least one `when`.
        opener != Keyword::Case
            || self
                .clauses
                .first()
                .is_some_and(|clause| clause.keyword == Keyword::When)
    }

    /// Append the frame's tags and bodies to `nodes` in source order.
    fn flatten_into(self, nodes: &mut Vec<Node>) {
        nodes.push(Node::Erb(self.opener.tag));
        nodes.extend(self.opener.body);
        for clause in self.clauses {
            nodes.push(Node::Erb(clause.tag));
            nodes.extend(clause.body);
        }
    }
}

/// Pairs the keyword tags of one sibling list as they arrive.
struct Pairing {
    /// Tree depth of the list itself.
    base: usize,
    output: Vec<Node>,
    open: Vec<Frame>,
    /// Openers past the depth limit. They are counted so that their `end`
    /// tags are not paired with an outer opener, and stay flat.
    overflow: usize,
}

impl Pairing {
    fn new(base: usize) -> Self {
        Self {
            base,
            output: Vec::new(),
            open: Vec::new(),
            overflow: 0,
        }
    }

    /// Tree depth of the next node pushed.
    fn depth(&self) -> usize {
        self.base + self.open.len()
    }

    fn current(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(frame) => frame.body_mut(),
            None => &mut self.output,
        }
    }

    fn push(&mut self, node: Node) {
        let tag = match node {
            Node::Erb(tag) => tag,
            other => {
                self.current().push(other);
                return;
            }
        };
        let Some(keyword) = classify(&tag) else {
            self.current().push(Node::Erb(tag));
            return;
        };

        if self.overflow > 0 {
            if keyword.is_opener() {
                self.overflow += 1;
            } else if keyword == Keyword::End {
                self.overflow -= 1;
            }
            self.current().push(Node::Erb(tag));
            return;
        }

        if keyword.is_opener() {
            if self.depth() >= MAX_NESTING_DEPTH {
                debug!(
                    keyword = ?keyword,
                    line = tag.location.start.line,
                    "left control flow past the depth limit flat"
                );
                self.overflow = 1;
                self.current().push(Node::Erb(tag));
            } else {
                self.open.push(Frame {
                    opener: Clause::new(keyword, tag),
                    clauses: Vec::new(),
                });
            }
        } else if keyword == Keyword::End {
            match self.open.pop() {
                Some(frame) => self.close(frame, tag),
                None => self.output.push(Node::Erb(tag)),
            }
        } else {
            match self.open.last_mut() {
                Some(frame) => frame.clauses.push(Clause::new(keyword, tag)),
                None => self.output.push(Node::Erb(tag)),
            }
        }
    }

    fn close(&mut self, frame: Frame, end_tag: ErbNode) {
        if frame.clauses_in_order() {
            let node = build(frame, end_tag);
            self.current().push(node);
        } else {
            debug!(
                keyword = ?frame.opener.keyword,
                line = frame.opener.tag.location.start.line,
                "left misordered control flow flat"
            );
            let nodes = self.current();
            frame.flatten_into(nodes);
            nodes.push(Node::Erb(end_tag));
        }
    }

    /// Openers still open here never found their `end`. Each one opened at
    /// the end of the frame below it, so flattening bottom-up keeps order.
    fn finish(mut self) -> Vec<Node> {
        for frame in std::mem::take(&mut self.open) {
            debug!(
                keyword = ?frame.opener.keyword,
                line = frame.opener.tag.location.start.line,
                "left unmatched control flow flat"
            );
            frame.flatten_into(&mut self.output);
        }
        self.output
    }
}

// =========================================================================
// Building
// =========================================================================

fn build(frame: Frame, end_tag: ErbNode) -> Node {
    let Frame { opener, clauses } = frame;
    let span = opener.tag.span.cover(end_tag.span);
    let location = opener.tag.location.to(end_tag.location);

    debug!(
        keyword = ?opener.keyword,
        line = location.start.line,
        clauses = clauses.len(),
        "matched control flow"
    );

    match opener.keyword {
        Keyword::If => {
            let mut node = build_if(opener, clauses);
            node.end_tag = Some(end_tag);
            node.span = span;
            node.location = location;
            Node::ErbIf(node)
        }
        Keyword::Unless => {
            let else_clause = clauses
                .into_iter()
                .next()
                .map(|clause| build_clause(ClauseKind::Else, clause));
            Node::ErbUnless(ErbUnless {
                condition: argument(&opener.tag.content),
                statements: opener.body,
                tag: opener.tag,
                else_clause,
                end_tag,
                span,
                location,
            })
        }
        Keyword::Case => {
            let mut conditions = Vec::new();
            let mut else_clause = None;
            for clause in clauses {
                if clause.keyword == Keyword::Else {
                    else_clause = Some(build_clause(ClauseKind::Else, clause));
                } else {
                    conditions.push(build_clause(ClauseKind::When, clause));
                }
            }
            Node::ErbCase(ErbCase {
                subject: argument(&opener.tag.content),
                children: opener.body,
                tag: opener.tag,
                conditions,
                else_clause,
                end_tag,
                span,
                location,
            })
        }
        Keyword::Begin => {
            let mut rescue_clauses = Vec::new();
            let mut else_clause = None;
            let mut ensure_clause = None;
            for clause in clauses {
                match clause.keyword {
                    Keyword::Else => else_clause = Some(build_clause(ClauseKind::Else, clause)),
                    Keyword::Ensure => {
                        ensure_clause = Some(build_clause(ClauseKind::Ensure, clause))
                    }
                    _ => rescue_clauses.push(build_clause(ClauseKind::Rescue, clause)),
                }
            }
            Node::ErbBegin(ErbBegin {
                statements: opener.body,
                tag: opener.tag,
                rescue_clauses,
                else_clause,
                ensure_clause,
                end_tag,
                span,
                location,
            })
        }
        Keyword::While | Keyword::Until | Keyword::For => {
            let kind = match opener.keyword {
                Keyword::While => LoopKind::While,
                Keyword::Until => LoopKind::Until,
                _ => LoopKind::For,
            };
            Node::ErbLoop(ErbLoop {
                kind,
                condition: argument(&opener.tag.content),
                statements: opener.body,
                tag: opener.tag,
                end_tag,
                span,
                location,
            })
        }
        _ => Node::ErbBlock(ErbBlock {
            body: opener.body,
            tag: opener.tag,
            end_tag,
            span,
            location,
        }),
    }
}

/// Build an `if`/`elsif` chain. The last clause is built first so each
/// branch can own the one after it.
fn build_if(opener: Clause, clauses: Vec<Clause>) -> ErbIf {
    let mut subsequent: Option<Box<ErbSubsequent>> = None;

    for clause in clauses.into_iter().rev() {
        let next = if clause.keyword == Keyword::Else {
            ErbSubsequent::Else(build_clause(ClauseKind::Else, clause))
        } else {
            ErbSubsequent::Elsif(branch(clause, subsequent.take()))
        };
        subsequent = Some(Box::new(next));
    }

    branch(opener, subsequent)
}

fn branch(clause: Clause, subsequent: Option<Box<ErbSubsequent>>) -> ErbIf {
    let statements = clause.body;
    let (span, location) = clause_bounds(&clause.tag, statements.last());
    let (span, location) = match subsequent.as_deref() {
        Some(ErbSubsequent::Elsif(next)) => (span.cover(next.span), location.to(next.location)),
        Some(ErbSubsequent::Else(next)) => (span.cover(next.span), location.to(next.location)),
        None => (span, location),
    };

    ErbIf {
        condition: argument(&clause.tag.content),
        tag: clause.tag,
        statements,
        subsequent,
        end_tag: None,
        span,
        location,
    }
}

fn build_clause(kind: ClauseKind, clause: Clause) -> ErbClause {
    let statements = clause.body;
    let (span, location) = clause_bounds(&clause.tag, statements.last());

    ErbClause {
        kind,
        argument: argument(&clause.tag.content),
        tag: clause.tag,
        statements,
        span,
        location,
    }
}

fn clause_bounds(tag: &ErbNode, last: Option<&Node>) -> (Span, Location) {
    match last {
        Some(node) => (tag.span.cover(node.span()), tag.location.to(node.location())),
        None => (tag.span, tag.location),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Element;
    use crate::{Parser, ParserOptions};
    use pretty_assertions::assert_eq;

    fn analyze_source(source: &str) -> Document {
        Parser::parse(source).document
    }

    fn flat(source: &str) -> Document {
        Parser::parse_with_options(source, ParserOptions::new().analyze(false)).document
    }

    fn element(node: &Node) -> &Element {
        match node {
            Node::Element(element) => element,
            other => panic!("Expected Element, got {other:?}"),
        }
    }

    fn erb_content(node: &Node) -> &str {
        match node {
            Node::Erb(erb) => &erb.content,
            other => panic!("Expected Erb, got {other:?}"),
        }
    }

    fn tag(content: &str) -> ErbNode {
        ErbNode {
            kind: ErbKind::Statement,
            tag_opening: "<%".to_string(),
            content: content.to_string(),
            tag_closing: Some("%>".to_string()),
            content_span: Span::default(),
            span: Span::default(),
            location: Location::default(),
            errors: Vec::new(),
        }
    }

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn test_classify_keywords() {
        assert_eq!(classify(&tag(" if user ")), Some(Keyword::If));
        assert_eq!(classify(&tag(" elsif admin ")), Some(Keyword::Elsif));
        assert_eq!(classify(&tag(" else ")), Some(Keyword::Else));
        assert_eq!(classify(&tag(" end ")), Some(Keyword::End));
        assert_eq!(classify(&tag("end")), Some(Keyword::End));
        assert_eq!(classify(&tag(" items.each do |item| ")), Some(Keyword::Block));
        assert_eq!(classify(&tag(" form.fields do ")), Some(Keyword::Block));
        assert_eq!(classify(&tag(" hash.each do |k, v| ")), Some(Keyword::Block));
    }

    #[test]
    fn test_classify_ignores_lookalikes() {
        assert_eq!(classify(&tag(" iffy = 1 ")), None);
        assert_eq!(classify(&tag(" endpoint ")), None);
        assert_eq!(classify(&tag(" undo ")), None);
        assert_eq!(classify(&tag(" if a then b end ")), None);
        assert_eq!(classify(&tag(" x = 1 ")), None);
    }

    #[test]
    fn test_classify_output_and_comment_tags() {
        let mut output = tag(" form_with(model: post) do |f| ");
        output.kind = ErbKind::Output;
        assert_eq!(classify(&output), Some(Keyword::Block));

        output.content = " if x ".to_string();
        assert_eq!(classify(&output), None);

        let mut comment = tag(" if x ");
        comment.kind = ErbKind::Comment;
        assert_eq!(classify(&comment), None);
    }

    #[test]
    fn test_argument() {
        assert_eq!(argument(" if user.admin? "), "user.admin?");
        assert_eq!(argument(" when 1, 2 "), "1, 2");
        assert_eq!(argument(" else "), "");
    }

    // =========================================================================
    // If / unless
    // =========================================================================

    #[test]
    fn test_if_else() {
        let document = analyze_source("<% if a %>A<% elsif b %>B<% else %>C<% end %>");
        assert_eq!(document.children.len(), 1);

        let Node::ErbIf(node) = &document.children[0] else {
            panic!("Expected ErbIf, got {:?}", document.children[0]);
        };
        assert_eq!(node.condition, "a");
        assert_eq!(node.statements.len(), 1);
        assert!(node.end_tag.is_some());
        assert_eq!(node.span, document.span);

        let Some(ErbSubsequent::Elsif(elsif)) = node.subsequent.as_deref() else {
            panic!("Expected elsif, got {:?}", node.subsequent);
        };
        assert_eq!(elsif.condition, "b");
        assert!(elsif.end_tag.is_none());

        let Some(ErbSubsequent::Else(else_clause)) = elsif.subsequent.as_deref() else {
            panic!("Expected else, got {:?}", elsif.subsequent);
        };
        assert_eq!(else_clause.kind, ClauseKind::Else);
        assert_eq!(else_clause.statements.len(), 1);
    }

    #[test]
    fn test_if_inside_element() {
        let document = analyze_source("<ul><% if show %><li>x</li><% end %></ul>");
        let ul = element(&document.children[0]);
        assert_eq!(ul.children.len(), 1);
        let Node::ErbIf(node) = &ul.children[0] else {
            panic!("Expected ErbIf, got {:?}", ul.children[0]);
        };
        assert_eq!(element(&node.statements[0]).tag_name, "li");
    }

    #[test]
    fn test_unless_else() {
        let document = analyze_source("<% unless a %>x<% else %>y<% end %>");
        let Node::ErbUnless(node) = &document.children[0] else {
            panic!("Expected ErbUnless, got {:?}", document.children[0]);
        };
        assert_eq!(node.condition, "a");
        assert!(node.else_clause.is_some());
    }

    #[test]
    fn test_nested_if_pairs_by_depth() {
        let document = analyze_source("<% if a %><% if b %>x<% end %>y<% end %>");
        assert_eq!(document.children.len(), 1);
        let Node::ErbIf(outer) = &document.children[0] else {
            panic!("Expected ErbIf, got {:?}", document.children[0]);
        };
        assert_eq!(outer.statements.len(), 2);
        let Node::ErbIf(inner) = &outer.statements[0] else {
            panic!("Expected ErbIf, got {:?}", outer.statements[0]);
        };
        assert_eq!(inner.condition, "b");
    }

    #[test]
    fn test_inner_else_belongs_to_inner_if() {
        let document = analyze_source("<% if a %><% if b %>1<% else %>2<% end %><% end %>");
        let Node::ErbIf(outer) = &document.children[0] else {
            panic!("Expected ErbIf, got {:?}", document.children[0]);
        };
        assert!(outer.subsequent.is_none());
        let Node::ErbIf(inner) = &outer.statements[0] else {
            panic!("Expected ErbIf, got {:?}", outer.statements[0]);
        };
        assert!(matches!(inner.subsequent.as_deref(), Some(ErbSubsequent::Else(_))));
    }

    // =========================================================================
    // Other constructs
    // =========================================================================

    #[test]
    fn test_case_when() {
        let document =
            analyze_source("<% case kind %>\n<% when :a %>A<% when :b, :c %>B<% else %>Z<% end %>");
        let Node::ErbCase(node) = &document.children[0] else {
            panic!("Expected ErbCase, got {:?}", document.children[0]);
        };
        assert_eq!(node.subject, "kind");
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.conditions.len(), 2);
        assert_eq!(node.conditions[1].argument, ":b, :c");
        assert!(node.else_clause.is_some());
    }

    #[test]
    fn test_loops() {
        let document = analyze_source(
            "<% while a %>w<% end %><% until b %>u<% end %><% for x in xs %>f<% end %>",
        );
        let kinds: Vec<LoopKind> = document
            .children
            .iter()
            .map(|node| match node {
                Node::ErbLoop(node) => node.kind,
                other => panic!("Expected ErbLoop, got {other:?}"),
            })
            .collect();
        assert_eq!(kinds, vec![LoopKind::While, LoopKind::Until, LoopKind::For]);
    }

    #[test]
    fn test_block() {
        let document = analyze_source("<%= form_with do |f| %><%= f.text_field :name %><% end %>");
        let Node::ErbBlock(node) = &document.children[0] else {
            panic!("Expected ErbBlock, got {:?}", document.children[0]);
        };
        assert_eq!(node.body.len(), 1);
        assert_eq!(node.tag.kind, ErbKind::Output);
    }

    #[test]
    fn test_begin_rescue_ensure() {
        let document = analyze_source(
            "<% begin %>a<% rescue ArgumentError %>b<% rescue %>c<% else %>d<% ensure %>e<% end %>",
        );
        let Node::ErbBegin(node) = &document.children[0] else {
            panic!("Expected ErbBegin, got {:?}", document.children[0]);
        };
        assert_eq!(node.rescue_clauses.len(), 2);
        assert_eq!(node.rescue_clauses[0].argument, "ArgumentError");
        assert!(node.else_clause.is_some());
        assert!(node.ensure_clause.is_some());
    }

    #[test]
    fn test_erb_in_attribute_value_is_analyzed() {
        let document = analyze_source(r#"<div class="<% if a %>on<% end %>"></div>"#);
        let div = element(&document.children[0]);
        let value = div.attribute("class").and_then(|a| a.value.as_ref()).unwrap();
        assert!(matches!(value.children[0], Node::ErbIf(_)));
    }

    // =========================================================================
    // Left flat
    // =========================================================================

    #[test]
    fn test_missing_end_stays_flat() {
        let source = "<% if a %>x<% else %>y";
        assert_eq!(analyze_source(source), flat(source));
    }

    #[test]
    fn test_else_before_elsif_stays_flat() {
        let source = "<% if a %>1<% else %>2<% elsif b %>3<% end %>";
        assert_eq!(analyze_source(source), flat(source));
    }

    #[test]
    fn test_stray_end_stays_flat() {
        let document = analyze_source("<% end %><% if a %>x<% end %>");
        assert_eq!(document.children.len(), 2);
        assert_eq!(erb_content(&document.children[0]), " end ");
        assert!(matches!(document.children[1], Node::ErbIf(_)));
    }

    #[test]
    fn test_unmatched_outer_keeps_inner_match() {
        let document = analyze_source("<% if a %><% if b %>x<% end %>");
        assert_eq!(document.children.len(), 2);
        assert_eq!(erb_content(&document.children[0]), " if a ");
        assert!(matches!(document.children[1], Node::ErbIf(_)));
    }

    #[test]
    fn test_when_outside_case_stays_flat() {
        let source = "<% if a %>1<% when b %>2<% end %>";
        assert_eq!(analyze_source(source), flat(source));
    }

    #[test]
    fn test_analysis_adds_no_errors() {
        let source = "<% if a %><div><% end %>";
        let analyzed = Parser::parse(source);
        let plain = Parser::parse_with_options(source, ParserOptions::new().analyze(false));
        assert_eq!(analyzed.errors, plain.errors);
    }

    #[test]
    fn test_misordered_inner_construct_stays_flat_inside_outer() {
        let document = analyze_source("<% if x %><% while a %><% else %><% end %><% end %>");
        assert_eq!(document.children.len(), 1);
        let Node::ErbIf(outer) = &document.children[0] else {
            panic!("Expected ErbIf, got {:?}", document.children[0]);
        };
        let contents: Vec<&str> = outer.statements.iter().map(erb_content).collect();
        assert_eq!(contents, vec![" while a ", " else ", " end "]);
    }

    // =========================================================================
    // Depth limit
    // =========================================================================

    fn nested_in_divs(count: usize) -> Document {
        let source = format!(
            "{}<% if a %>x<% end %>{}",
            "<div>".repeat(count),
            "</div>".repeat(count)
        );
        analyze_source(&source)
    }

    fn innermost(document: &Document, count: usize) -> &[Node] {
        let mut nodes = &document.children[..];
        for _ in 0..count {
            nodes = &element(&nodes[0]).children;
        }
        nodes
    }

    #[test]
    fn test_deeply_nested_if_is_capped() {
        let count = 5_000;
        let source = format!("{}x{}", "<% if a %>".repeat(count), "<% end %>".repeat(count));
        let document = analyze_source(&source);
        assert_eq!(document.children.len(), 1);

        let mut levels = 0;
        let mut nodes = &document.children;
        while let Some(Node::ErbIf(node)) = nodes.first() {
            levels += 1;
            nodes = &node.statements;
        }
        assert_eq!(levels, MAX_NESTING_DEPTH);
        assert_eq!(nodes.len(), 2 * (count - MAX_NESTING_DEPTH) + 1);
        assert!(nodes
            .iter()
            .all(|node| matches!(node, Node::Erb(_) | Node::Text(_))));
    }

    #[test]
    fn test_many_unmatched_openers_stay_flat() {
        let source = "<% if a %>x".repeat(20_000);
        let document = analyze_source(&source);
        assert_eq!(document.children.len(), 40_000);
        assert!(document == flat(&source));
    }

    #[test]
    fn test_depth_limit_counts_enclosing_elements() {
        let document = nested_in_divs(MAX_NESTING_DEPTH - 1);
        let nodes = innermost(&document, MAX_NESTING_DEPTH - 1);
        assert_eq!(nodes.len(), 1);
        assert!(matches!(nodes[0], Node::ErbIf(_)));

        let document = nested_in_divs(MAX_NESTING_DEPTH);
        let nodes = innermost(&document, MAX_NESTING_DEPTH);
        let contents: Vec<&str> = [&nodes[0], &nodes[2]].into_iter().map(erb_content).collect();
        assert_eq!(contents, vec![" if a ", " end "]);
    }
}
