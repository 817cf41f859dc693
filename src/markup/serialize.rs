use super::{is_void, Attribute, Document, Element, Node};

pub(super) fn to_html(doc: &Document) -> String {
    let mut out = String::new();
    for node in &doc.children {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Element(el) => write_element(out, el),
        Node::Text(text)
        | Node::ServerBlock(text)
        | Node::Declaration(text)
        | Node::Comment(text) => out.push_str(text),
    }
}

fn write_element(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.name);
    for attr in &el.attrs {
        out.push(' ');
        write_attr(out, attr);
    }

    if el.children.is_empty() && is_void(&el.name) {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &el.children {
        write_node(out, child);
    }
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

/// Double quotes unless the value itself contains them, in which case single
/// quotes are used; `&quot;` only when both kinds appear. Quotes inside
/// `<% %>` spans do not count and are never escaped.
fn write_attr(out: &mut String, attr: &Attribute) {
    out.push_str(&attr.name);
    let Some(value) = &attr.value else {
        return;
    };
    let parts = split_server_spans(value);
    let plain_contains = |q: char| parts.iter().any(|(block, s)| !block && s.contains(q));
    if !plain_contains('"') {
        out.push_str(&format!("=\"{value}\""));
    } else if !plain_contains('\'') {
        out.push_str(&format!("='{value}'"));
    } else {
        out.push_str("=\"");
        for (block, s) in parts {
            if block {
                out.push_str(s);
            } else {
                out.push_str(&s.replace('"', "&quot;"));
            }
        }
        out.push('"');
    }
}

/// Split a value into plain text and `<% %>` pieces, flagging the latter.
fn split_server_spans(value: &str) -> Vec<(bool, &str)> {
    let mut parts = Vec::new();
    let mut rest = value;
    while let Some(open) = rest.find("<%") {
        let close = rest[open + 2..]
            .find("%>")
            .map_or(rest.len(), |p| open + 2 + p + 2);
        if open > 0 {
            parts.push((false, &rest[..open]));
        }
        parts.push((true, &rest[open..close]));
        rest = &rest[close..];
    }
    if !rest.is_empty() {
        parts.push((false, rest));
    }
    parts
}
