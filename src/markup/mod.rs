//! Markup tree — a tolerant HTML-style parser, the element tree it produces,
//! and the serializer that turns the tree back into text.
//!
//! Text, attribute values and `<% %>` server blocks are kept verbatim: nothing
//! is entity-decoded on the way in or escaped on the way out, so embedded
//! server expressions survive a parse/serialize cycle unchanged.

mod parser;
mod serialize;

use std::fmt;

/// A parsed page: the ordered top-level nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// `<% ... %>`, `<%= ... %>`, `<%# ... %>` and friends, delimiters included.
    ServerBlock(String),
    /// `<!DOCTYPE ...>` and other `<!...>` / `<?...?>` declarations.
    Declaration(String),
    /// `<!-- ... -->`, delimiters included.
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lower-cased tag name, namespace prefix included (`asp:button`).
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
}

/// A single attribute. `value` is `None` for a bare attribute (`disabled`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Look up an attribute by name, ignoring ASCII case.
    /// A bare attribute yields `Some("")`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Remove every attribute called `name` (ASCII case-insensitive).
    /// Returns true if anything was removed.
    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|a| !a.name.eq_ignore_ascii_case(name));
        self.attrs.len() != before
    }
}

impl Document {
    /// Parse markup, recovering from malformed input.
    ///
    /// Never fails: every recovery the parser had to make is reported as a
    /// [`ParseWarning`] alongside the tree.
    pub fn parse(source: &str) -> (Document, Vec<ParseWarning>) {
        parser::parse(source)
    }

    /// Serialize the tree back to markup, preserving node and attribute order.
    pub fn to_html(&self) -> String {
        serialize::to_html(self)
    }

    /// All elements in document order (pre-order, depth-first).
    pub fn elements(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        collect_elements(&self.children, &mut out);
        out
    }
}

fn collect_elements<'a>(nodes: &'a [Node], out: &mut Vec<&'a Element>) {
    for node in nodes {
        if let Node::Element(el) = node {
            out.push(el);
            collect_elements(&el.children, out);
        }
    }
}

/// Elements that never have content or an end tag.
pub(crate) fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// A recovery the parser made on malformed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line of the construct that triggered the recovery.
    pub line: usize,
    pub kind: WarningKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// Element still open at end of input; closed there.
    UnclosedElement { name: String },
    /// Element closed implicitly by the end tag of an ancestor.
    ImplicitlyClosed { name: String, by: String },
    /// End tag with no matching open element; dropped.
    StrayEndTag { name: String },
    /// `<` that never reaches its `>`; kept as text.
    UnterminatedTag,
    /// `<!--` without `-->`; runs to end of input.
    UnterminatedComment,
    /// `<%` without `%>`; runs to end of input.
    UnterminatedServerBlock,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::UnclosedElement { name } => {
                write!(f, "<{name}> is never closed; closed at end of input")
            }
            WarningKind::ImplicitlyClosed { name, by } => {
                write!(f, "<{name}> closed implicitly by </{by}>")
            }
            WarningKind::StrayEndTag { name } => {
                write!(f, "</{name}> has no matching start tag; dropped")
            }
            WarningKind::UnterminatedTag => write!(f, "unterminated tag; kept as text"),
            WarningKind::UnterminatedComment => write!(f, "unterminated comment"),
            WarningKind::UnterminatedServerBlock => write!(f, "unterminated <% block"),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}
