//! Text dumps of documents and token streams.
//!
//! The tree dump prints one `@ TypeName (location: ...)` header per node
//! followed by its fields in a fixed order, drawn with box characters:
//!
//! ```text
//! @ DocumentNode (location: (1:1)-(1:12))
//! └── children: (1 item)
//!     └── @ HTMLElementNode (location: (1:1)-(1:12))
//!         ├── tag_name: "p"
//!         ...
//! ```
//!
//! The output is deterministic and is meant for snapshot-style tests.

use crate::ast::{
    Attribute, AttributeValue, ClauseKind, CloseTag, Document, ErbClause, ErbIf, ErbKind,
    ErbLoop, ErbNode, ErbSubsequent, LoopKind, Node, OpenTag,
};
use crate::ParseError;
use herb_lexer::{Location, Token};

/// Render `document` as an indented tree.
pub fn document(document: &Document) -> String {
    let mut printer = Printer::default();
    printer.item(Item::Document(document), "");
    printer.out
}

/// Render one token per line.
pub fn tokens(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&format!("{token}\n"));
    }
    out
}

/// The printed name of a node.
pub fn type_name(node: &Node) -> &'static str {
    match node {
        Node::Element(_) => "HTMLElementNode",
        Node::CloseTag(_) => "HTMLCloseTagNode",
        Node::Attribute(_) => "HTMLAttributeNode",
        Node::Text(_) => "HTMLTextNode",
        Node::Whitespace(_) => "WhitespaceNode",
        Node::Comment(_) => "HTMLCommentNode",
        Node::Doctype(_) => "HTMLDoctypeNode",
        Node::Erb(_) => "ERBContentNode",
        Node::ErbIf(_) => "ERBIfNode",
        Node::ErbUnless(_) => "ERBUnlessNode",
        Node::ErbCase(_) => "ERBCaseNode",
        Node::ErbLoop(node) => loop_name(node),
        Node::ErbBlock(_) => "ERBBlockNode",
        Node::ErbBegin(_) => "ERBBeginNode",
    }
}

fn loop_name(node: &ErbLoop) -> &'static str {
    match node.kind {
        LoopKind::While => "ERBWhileNode",
        LoopKind::Until => "ERBUntilNode",
        LoopKind::For => "ERBForNode",
    }
}

fn clause_name(clause: &ErbClause) -> &'static str {
    match clause.kind {
        ClauseKind::Else => "ERBElseNode",
        ClauseKind::When => "ERBWhenNode",
        ClauseKind::Rescue => "ERBRescueNode",
        ClauseKind::Ensure => "ERBEnsureNode",
    }
}

/// Anything that prints with a header line.
#[derive(Clone, Copy)]
enum Item<'a> {
    Document(&'a Document),
    Node(&'a Node),
    OpenTag(&'a OpenTag),
    CloseTag(&'a CloseTag),
    AttributeValue(&'a AttributeValue),
    If(&'a ErbIf),
    Clause(&'a ErbClause),
    End(&'a ErbNode),
}

enum Field<'a> {
    Str(&'a str),
    OptStr(Option<&'a str>),
    Char(Option<char>),
    Bool(bool),
    Child(Option<Item<'a>>),
    List(Vec<Item<'a>>),
    Errors(&'a [ParseError]),
}

type Fields<'a> = Vec<(&'static str, Field<'a>)>;

fn nodes(nodes: &[Node]) -> Field<'_> {
    Field::List(nodes.iter().map(Item::Node).collect())
}

fn clauses(clauses: &[ErbClause]) -> Field<'_> {
    Field::List(clauses.iter().map(Item::Clause).collect())
}

fn clause(clause: Option<&ErbClause>) -> Field<'_> {
    Field::Child(clause.map(Item::Clause))
}

fn tag_fields(tag: &ErbNode) -> Fields<'_> {
    vec![
        ("tag_opening", Field::Str(&tag.tag_opening)),
        ("content", Field::Str(&tag.content)),
        ("tag_closing", Field::OptStr(tag.tag_closing.as_deref())),
    ]
}

fn with_errors<'a>(mut fields: Fields<'a>, errors: &'a [ParseError]) -> Fields<'a> {
    if !errors.is_empty() {
        fields.push(("errors", Field::Errors(errors)));
    }
    fields
}

fn describe(item: Item<'_>) -> (&'static str, Location, Fields<'_>) {
    match item {
        Item::Document(document) => (
            "DocumentNode",
            document.location,
            vec![("children", nodes(&document.children))],
        ),
        Item::OpenTag(tag) => (
            "HTMLOpenTagNode",
            tag.location,
            with_errors(
                vec![
                    ("tag_name", Field::Str(&tag.tag_name)),
                    ("children", nodes(&tag.children)),
                    ("self_closing", Field::Bool(tag.self_closing)),
                ],
                &tag.errors,
            ),
        ),
        Item::CloseTag(tag) => close_tag(tag),
        Item::AttributeValue(value) => (
            "HTMLAttributeValueNode",
            value.location,
            vec![
                ("quote", Field::Char(value.quote)),
                ("children", nodes(&value.children)),
            ],
        ),
        Item::If(node) => if_branch(node),
        Item::Clause(node) => {
            let mut fields = tag_fields(&node.tag);
            if matches!(node.kind, ClauseKind::When | ClauseKind::Rescue) {
                fields.push(("argument", Field::Str(&node.argument)));
            }
            fields.push(("statements", nodes(&node.statements)));
            (clause_name(node), node.location, fields)
        }
        Item::End(tag) => ("ERBEndNode", tag.location, with_errors(tag_fields(tag), &tag.errors)),
        Item::Node(node) => describe_node(node),
    }
}

fn close_tag(tag: &CloseTag) -> (&'static str, Location, Fields<'_>) {
    (
        "HTMLCloseTagNode",
        tag.location,
        with_errors(
            vec![
                ("tag_name", Field::Str(&tag.tag_name)),
                ("children", nodes(&tag.children)),
            ],
            &tag.errors,
        ),
    )
}

fn if_branch(node: &ErbIf) -> (&'static str, Location, Fields<'_>) {
    let mut fields = tag_fields(&node.tag);
    fields.push(("condition", Field::Str(&node.condition)));
    fields.push(("statements", nodes(&node.statements)));
    fields.push((
        "subsequent",
        Field::Child(node.subsequent.as_deref().map(|next| match next {
            ErbSubsequent::Elsif(branch) => Item::If(branch),
            ErbSubsequent::Else(clause) => Item::Clause(clause),
        })),
    ));
    fields.push(("end_node", Field::Child(node.end_tag.as_ref().map(Item::End))));
    ("ERBIfNode", node.location, with_errors(fields, &node.tag.errors))
}

fn attribute(node: &Attribute) -> Fields<'_> {
    let mut fields = vec![
        ("name", Field::Str(&node.name)),
        ("equals", Field::Bool(node.equals)),
        ("value", Field::Child(node.value.as_ref().map(Item::AttributeValue))),
    ];
    if !node.children.is_empty() {
        fields.push(("children", nodes(&node.children)));
    }
    with_errors(fields, &node.errors)
}

fn describe_node(node: &Node) -> (&'static str, Location, Fields<'_>) {
    let name = type_name(node);
    let location = node.location();

    let fields = match node {
        Node::Element(element) => with_errors(
            vec![
                ("tag_name", Field::Str(&element.tag_name)),
                ("open_tag", Field::Child(Some(Item::OpenTag(&element.open_tag)))),
                ("body", nodes(&element.children)),
                ("close_tag", Field::Child(element.close_tag.as_ref().map(Item::CloseTag))),
                ("is_void", Field::Bool(element.is_void)),
            ],
            &element.errors,
        ),
        Node::CloseTag(tag) => return close_tag(tag),
        Node::Attribute(node) => attribute(node),
        Node::Text(text) => with_errors(vec![("content", Field::Str(&text.content))], &text.errors),
        Node::Whitespace(whitespace) => vec![("value", Field::Str(&whitespace.value))],
        Node::Comment(comment) => with_errors(
            vec![
                ("children", nodes(&comment.children)),
                ("closed", Field::Bool(comment.closed)),
            ],
            &comment.errors,
        ),
        Node::Doctype(doctype) => with_errors(
            vec![("content", Field::Str(&doctype.content))],
            &doctype.errors,
        ),
        Node::Erb(erb) => with_errors(tag_fields(erb), &erb.errors),
        Node::ErbIf(node) => return if_branch(node),
        Node::ErbUnless(node) => {
            let mut fields = tag_fields(&node.tag);
            fields.push(("condition", Field::Str(&node.condition)));
            fields.push(("statements", nodes(&node.statements)));
            fields.push(("else_clause", clause(node.else_clause.as_ref())));
            fields.push(("end_node", Field::Child(Some(Item::End(&node.end_tag)))));
            fields
        }
        Node::ErbCase(node) => {
            let mut fields = tag_fields(&node.tag);
            fields.push(("subject", Field::Str(&node.subject)));
            fields.push(("children", nodes(&node.children)));
            fields.push(("conditions", clauses(&node.conditions)));
            fields.push(("else_clause", clause(node.else_clause.as_ref())));
            fields.push(("end_node", Field::Child(Some(Item::End(&node.end_tag)))));
            fields
        }
        Node::ErbLoop(node) => {
            let mut fields = tag_fields(&node.tag);
            fields.push(("condition", Field::Str(&node.condition)));
            fields.push(("statements", nodes(&node.statements)));
            fields.push(("end_node", Field::Child(Some(Item::End(&node.end_tag)))));
            fields
        }
        Node::ErbBlock(node) => {
            let mut fields = tag_fields(&node.tag);
            fields.push(("body", nodes(&node.body)));
            fields.push(("end_node", Field::Child(Some(Item::End(&node.end_tag)))));
            fields
        }
        Node::ErbBegin(node) => {
            let mut fields = tag_fields(&node.tag);
            fields.push(("statements", nodes(&node.statements)));
            fields.push(("rescue_clauses", clauses(&node.rescue_clauses)));
            fields.push(("else_clause", clause(node.else_clause.as_ref())));
            fields.push(("ensure_clause", clause(node.ensure_clause.as_ref())));
            fields.push(("end_node", Field::Child(Some(Item::End(&node.end_tag)))));
            fields
        }
    };

    let fields = match node {
        Node::ErbUnless(node) => with_errors(fields, &node.tag.errors),
        Node::ErbCase(node) => with_errors(fields, &node.tag.errors),
        Node::ErbLoop(node) => with_errors(fields, &node.tag.errors),
        Node::ErbBlock(node) => with_errors(fields, &node.tag.errors),
        Node::ErbBegin(node) => with_errors(fields, &node.tag.errors),
        _ => fields,
    };

    (name, location, fields)
}

fn erb_kind(kind: ErbKind) -> &'static str {
    match kind {
        ErbKind::Statement => "statement",
        ErbKind::Output => "output",
        ErbKind::Comment => "comment",
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[derive(Default)]
struct Printer {
    out: String,
}

impl Printer {
    /// Print `item`'s header on the current line, then its fields. `prefix`
    /// is the indentation of the lines below the header.
    fn item(&mut self, item: Item<'_>, prefix: &str) {
        let (name, location, fields) = describe(item);
        match item {
            Item::Node(Node::Erb(erb)) => self.out.push_str(&format!(
                "@ {name} (location: {location}) [{}]\n",
                erb_kind(erb.kind)
            )),
            _ => self.out.push_str(&format!("@ {name} (location: {location})\n")),
        }

        let count = fields.len();
        for (index, (label, field)) in fields.into_iter().enumerate() {
            let last = index + 1 == count;
            let (branch, indent) = if last {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            let child_prefix = format!("{prefix}{indent}");

            match field {
                Field::Str(value) => self.line(prefix, branch, &format!("{label}: {value:?}")),
                Field::OptStr(Some(value)) => {
                    self.line(prefix, branch, &format!("{label}: {value:?}"))
                }
                Field::OptStr(None) | Field::Char(None) | Field::Child(None) => {
                    self.line(prefix, branch, &format!("{label}: ∅"))
                }
                Field::Char(Some(value)) => self.line(prefix, branch, &format!("{label}: {value:?}")),
                Field::Bool(value) => self.line(prefix, branch, &format!("{label}: {value}")),
                Field::Child(Some(child)) => {
                    self.line(prefix, branch, &format!("{label}:"));
                    self.out.push_str(&format!("{child_prefix}└── "));
                    self.item(child, &format!("{child_prefix}    "));
                }
                Field::List(items) if items.is_empty() => {
                    self.line(prefix, branch, &format!("{label}: []"))
                }
                Field::List(items) => {
                    self.line(prefix, branch, &format!("{label}: ({})", plural(items.len(), "item")));
                    let count = items.len();
                    for (index, child) in items.into_iter().enumerate() {
                        let (branch, indent) = if index + 1 == count {
                            ("└── ", "    ")
                        } else {
                            ("├── ", "│   ")
                        };
                        self.out.push_str(&format!("{child_prefix}{branch}"));
                        self.item(child, &format!("{child_prefix}{indent}"));
                    }
                }
                Field::Errors(errors) => {
                    self.line(prefix, branch, &format!("{label}: ({})", plural(errors.len(), "error")));
                    let count = errors.len();
                    for (index, error) in errors.iter().enumerate() {
                        let branch = if index + 1 == count { "└── " } else { "├── " };
                        self.line(
                            &child_prefix,
                            branch,
                            &format!(
                                "@ {} [{}] (location: {}) {:?}",
                                error.kind.name(),
                                error.severity,
                                error.location,
                                error.message()
                            ),
                        );
                    }
                }
            }
        }
    }

    fn line(&mut self, prefix: &str, branch: &str, text: &str) {
        self.out.push_str(&format!("{prefix}{branch}{text}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Parser, ParserOptions};
    use herb_lexer::Scanner;
    use pretty_assertions::assert_eq;

    fn dump(source: &str) -> String {
        document(&Parser::parse(source).document)
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(
            dump(""),
            "@ DocumentNode (location: (1:1)-(1:1))\n└── children: []\n"
        );
    }

    #[test]
    fn test_element_dump() {
        let expected = "\
@ DocumentNode (location: (1:1)-(1:16))
└── children: (1 item)
    └── @ HTMLElementNode (location: (1:1)-(1:16))
        ├── tag_name: \"p\"
        ├── open_tag:
        │   └── @ HTMLOpenTagNode (location: (1:1)-(1:4))
        │       ├── tag_name: \"p\"
        │       ├── children: []
        │       └── self_closing: false
        ├── body: (1 item)
        │   └── @ ERBContentNode (location: (1:4)-(1:12)) [output]
        │       ├── tag_opening: \"<%=\"
        │       ├── content: \" x \"
        │       └── tag_closing: \"%>\"
        ├── close_tag:
        │   └── @ HTMLCloseTagNode (location: (1:12)-(1:16))
        │       ├── tag_name: \"p\"
        │       └── children: []
        └── is_void: false
";
        assert_eq!(dump("<p><%= x %></p>"), expected);
    }

    #[test]
    fn test_attribute_dump() {
        let output = dump(r#"<a href="/">x</a>"#);
        assert!(output.contains("@ HTMLAttributeNode (location: (1:4)-(1:12))"));
        assert!(output.contains("├── name: \"href\""));
        assert!(output.contains("├── equals: true"));
        assert!(output.contains("@ HTMLAttributeValueNode"));
        assert!(output.contains("├── quote: '\"'"));
        assert!(output.contains("@ HTMLTextNode"));
    }

    #[test]
    fn test_errors_are_listed() {
        let output = dump("<div>");
        assert!(output.contains("└── errors: (1 error)"));
        assert!(output.contains("@ UnclosedElementError [error] (location: (1:1)-(1:6))"));
    }

    #[test]
    fn test_control_flow_dump() {
        let output = dump("<% if a %>x<% else %>y<% end %>");
        assert!(output.contains("@ ERBIfNode"));
        assert!(output.contains("├── condition: \"a\""));
        assert!(output.contains("@ ERBElseNode"));
        assert!(output.contains("@ ERBEndNode"));
        assert!(!output.contains("ERBContentNode"));
    }

    #[test]
    fn test_loop_and_clause_names() {
        let output = dump("<% case x %><% when 1 %>a<% end %><% for i in xs %>b<% end %>");
        assert!(output.contains("@ ERBCaseNode"));
        assert!(output.contains("@ ERBWhenNode"));
        assert!(output.contains("├── argument: \"1\""));
        assert!(output.contains("@ ERBForNode"));
    }

    #[test]
    fn test_whitespace_dump() {
        let result = Parser::parse_with_options(
            "<div  id=\"a\"></div>",
            ParserOptions::new().track_whitespace(true),
        );
        let output = document(&result.document);
        assert!(output.contains("@ WhitespaceNode (location: (1:5)-(1:7))"));
        assert!(output.contains("value: \"  \""));
    }

    #[test]
    fn test_attribute_whitespace_dump() {
        let result = Parser::parse_with_options(
            "<a href= \"/\">x</a>",
            ParserOptions::new().track_whitespace(true),
        );
        let output = document(&result.document);
        assert!(output.contains("├── value:"));
        assert!(output.contains("@ WhitespaceNode (location: (1:3)-(1:4))"));
        assert!(output.contains("@ WhitespaceNode (location: (1:9)-(1:10))"));

        let plain = dump("<a href= \"/\">x</a>");
        assert!(!plain.contains("WhitespaceNode"));
    }

    #[test]
    fn test_dump_is_deterministic() {
        let source = "<ul>\n<% items.each do |i| %>\n  <li><%= i %></li>\n<% end %>\n</ul>";
        assert_eq!(dump(source), dump(source));
        assert!(dump(source).contains("@ ERBBlockNode"));
    }

    #[test]
    fn test_type_names() {
        let document = Parser::parse("<!DOCTYPE html><!-- c --></x>").document;
        let names: Vec<&str> = document.children.iter().map(type_name).collect();
        assert_eq!(names, vec!["HTMLDoctypeNode", "HTMLCommentNode", "HTMLCloseTagNode"]);
    }

    #[test]
    fn test_token_dump() {
        let source = "<div>";
        let output = tokens(&Scanner::tokenize(source));
        assert_eq!(
            output,
            "\
TOKEN_HTML_TAG_START \"<\" [0..1] (1:1)-(1:2)
TOKEN_IDENTIFIER \"div\" [1..4] (1:2)-(1:5)
TOKEN_HTML_TAG_END \">\" [4..5] (1:5)-(1:6)
TOKEN_EOF \"\" [5..5] (1:6)-(1:6)
"
        );
    }
}
