//! Rewrites Web Forms server controls into plain HTML.
//!
//! Three passes over the parsed tree, in this order:
//!
//! 1. drop every `<form runat="server">` together with its subtree
//! 2. strip the `runat` attribute from every remaining element
//! 3. rename `asp:*` controls according to the rule table
//!
//! Form removal has to come first: once `runat` is stripped a server form
//! can no longer be told apart from a plain one.

use crate::markup::{Document, Element, Node, ParseWarning};
use tracing::debug;

/// Maps one legacy control tag (lower-cased) to its HTML element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlTagRule {
    pub legacy: &'static str,
    pub target: &'static str,
}

impl ControlTagRule {
    const fn new(legacy: &'static str, target: &'static str) -> Self {
        Self { legacy, target }
    }
}

pub const CONTROL_TAG_RULES: &[ControlTagRule] = &[
    ControlTagRule::new("asp:button", "button"),
    ControlTagRule::new("asp:textbox", "input"),
    ControlTagRule::new("asp:label", "span"),
    ControlTagRule::new("asp:dropdownlist", "select"),
    ControlTagRule::new("asp:checkbox", "input"),
    ControlTagRule::new("asp:radiobutton", "input"),
    ControlTagRule::new("asp:hyperlink", "a"),
    ControlTagRule::new("asp:image", "img"),
];

/// The server-binding attribute.
pub const RUNAT: &str = "runat";

/// Output of [`map_controls`]: the rewritten tree plus whatever the parser
/// had to recover from.
#[derive(Debug)]
pub struct Mapped {
    pub document: Document,
    pub warnings: Vec<ParseWarning>,
}

/// Parse normalized markup and rewrite its server controls.
pub fn map_controls(normalized: &str, rules: &[ControlTagRule]) -> Mapped {
    let (mut document, warnings) = Document::parse(normalized);
    apply_rules(&mut document, rules);
    Mapped { document, warnings }
}

/// Run the rewrite passes on an already parsed tree.
///
/// Applying this twice is the same as applying it once.
pub fn apply_rules(document: &mut Document, rules: &[ControlTagRule]) {
    let removed = remove_server_forms(&mut document.children);
    let stripped = strip_runat(&mut document.children);
    let renamed = rename_controls(&mut document.children, rules);
    debug!(removed, stripped, renamed, "mapped server controls");
}

fn is_server_form(el: &Element) -> bool {
    el.name == "form"
        && el
            .attr(RUNAT)
            .is_some_and(|v| v.eq_ignore_ascii_case("server"))
}

fn remove_server_forms(nodes: &mut Vec<Node>) -> usize {
    let before = nodes.len();
    nodes.retain(|n| !matches!(n, Node::Element(el) if is_server_form(el)));
    let mut removed = before - nodes.len();
    for node in nodes.iter_mut() {
        if let Node::Element(el) = node {
            removed += remove_server_forms(&mut el.children);
        }
    }
    removed
}

fn strip_runat(nodes: &mut [Node]) -> usize {
    let mut stripped = 0;
    for node in nodes {
        if let Node::Element(el) = node {
            if el.remove_attr(RUNAT) {
                stripped += 1;
            }
            stripped += strip_runat(&mut el.children);
        }
    }
    stripped
}

fn rename_controls(nodes: &mut [Node], rules: &[ControlTagRule]) -> usize {
    let mut renamed = 0;
    for node in nodes {
        if let Node::Element(el) = node {
            if let Some(rule) = rules
                .iter()
                .find(|r| r.legacy.eq_ignore_ascii_case(&el.name))
            {
                el.name = rule.target.to_string();
                renamed += 1;
            }
            renamed += rename_controls(&mut el.children, rules);
        }
    }
    renamed
}
