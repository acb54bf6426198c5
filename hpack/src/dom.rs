//! Trees the encoder accepts.
//!
//! [`Node`] is a plain owned tree that callers can build by hand, the
//! html5ever [`RcDom`] is what comes out of parsing an html string. Both
//! carry comments and doctypes, which the encoder drops.
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Document(Vec<Node>),
    Doctype(String),
    Comment(String),
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn document(children: Vec<Node>) -> Node {
        Node::Document(children)
    }

    pub fn element(name: &str, attrs: &[(&str, &str)], children: Vec<Node>) -> Node {
        Node::Element(Element {
            name: name.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
        })
    }

    pub fn text(content: &str) -> Node {
        Node::Text(content.to_string())
    }
}

/// Parse an html document with the html5 tree builder.
pub fn parse_html(html: &str) -> RcDom {
    parse_document(RcDom::default(), ParseOpts::default()).one(html)
}

// Unicode White_Space less NEL, plus the byte order mark
fn is_space(c: char) -> bool {
    (c.is_whitespace() && c != '\u{85}') || c == '\u{feff}'
}

/// Replace every run of whitespace with a single space.
pub fn collapse(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;

    for c in text.chars() {
        if is_space(c) {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Collapse whitespace in every text node of the tree.
pub fn collapse_whitespace(node: &mut Node) {
    match node {
        Node::Text(content) => *content = collapse(content),
        Node::Document(children) => children.iter_mut().for_each(collapse_whitespace),
        Node::Element(element) => element.children.iter_mut().for_each(collapse_whitespace),
        Node::Doctype(_) | Node::Comment(_) => (),
    }
}

/// Collapse whitespace in every text node under a parsed node.
pub fn collapse_whitespace_rcdom(handle: &Handle) {
    if let NodeData::Text { contents } = &handle.data {
        let collapsed = collapse(&contents.borrow());
        *contents.borrow_mut() = collapsed.into();
    }

    for child in handle.children.borrow().iter() {
        collapse_whitespace_rcdom(child);
    }
}

/// The text of the first `<title>` element, whitespace collapsed and trimmed.
pub fn title(dom: &RcDom) -> Option<String> {
    fn find(handle: &Handle) -> Option<String> {
        if let NodeData::Element { name, .. } = &handle.data {
            if &*name.local == "title" {
                let mut text = String::new();
                for child in handle.children.borrow().iter() {
                    if let NodeData::Text { contents } = &child.data {
                        text.push_str(&contents.borrow());
                    }
                }
                return Some(collapse(&text).trim().to_string());
            }
        }
        handle.children.borrow().iter().find_map(find)
    }

    find(&dom.document)
}
