//! Tokenizer and tree builder.
//!
//! Recovery policy:
//! - an element still open at end of input is closed there
//! - an end tag closes the nearest open element of that name, implicitly
//!   closing anything opened after it
//! - an end tag with no open element of that name is dropped
//! - a `<` that never reaches a `>` is kept as text
//! - an unterminated comment or `<%` block runs to end of input
//! - a void element (`input`, `img`, ...) takes children only when a matching
//!   end tag follows before the next start tag of the same name
//!
//! Every recovery is recorded as a [`ParseWarning`].

use super::{is_void, Attribute, Document, Element, Node, ParseWarning, WarningKind};

#[derive(Debug)]
enum Token {
    Start {
        name: String,
        attrs: Vec<Attribute>,
        self_closing: bool,
        offset: usize,
    },
    End {
        name: String,
        offset: usize,
    },
    Text(String),
    Verbatim(Node),
}

pub(super) fn parse(source: &str) -> (Document, Vec<ParseWarning>) {
    let mut warnings = Vec::new();
    let tokens = tokenize(source, &mut warnings);
    let document = build_tree(source, tokens, &mut warnings);
    warnings.sort_by_key(|w| w.line);
    (document, warnings)
}

fn warn(warnings: &mut Vec<ParseWarning>, source: &str, offset: usize, kind: WarningKind) {
    let line = source[..offset].bytes().filter(|&b| b == b'\n').count() + 1;
    warnings.push(ParseWarning { line, kind });
}

fn tokenize(src: &str, warnings: &mut Vec<ParseWarning>) -> Vec<Token> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'<' {
            if starts_with(bytes, i, b"<!--") {
                let (end, closed) = find_close(src, i + 4, "-->");
                if !closed {
                    warn(warnings, src, i, WarningKind::UnterminatedComment);
                }
                out.push(Token::Verbatim(Node::Comment(src[i..end].to_string())));
                i = end;
                continue;
            }

            if starts_with(bytes, i, b"<%") {
                let (end, closed) = find_close(src, i + 2, "%>");
                if !closed {
                    warn(warnings, src, i, WarningKind::UnterminatedServerBlock);
                }
                out.push(Token::Verbatim(Node::ServerBlock(src[i..end].to_string())));
                i = end;
                continue;
            }

            if starts_with(bytes, i, b"<!") || starts_with(bytes, i, b"<?") {
                if let Some(gt) = src[i..].find('>') {
                    let end = i + gt + 1;
                    out.push(Token::Verbatim(Node::Declaration(src[i..end].to_string())));
                    i = end;
                    continue;
                }
                warn(warnings, src, i, WarningKind::UnterminatedTag);
            } else if starts_with(bytes, i, b"</") {
                if let Some((name, next)) = parse_end_tag(bytes, i) {
                    out.push(Token::End { name, offset: i });
                    i = next;
                    continue;
                }
                if !bytes[i + 2..].contains(&b'>') {
                    warn(warnings, src, i, WarningKind::UnterminatedTag);
                }
            } else if bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
                match parse_start_tag(src, i) {
                    Some((name, attrs, self_closing, next)) => {
                        let raw_text = !self_closing && is_raw_text_tag(&name);
                        out.push(Token::Start {
                            name: name.clone(),
                            attrs,
                            self_closing,
                            offset: i,
                        });
                        i = next;
                        if raw_text {
                            i = take_raw_text(src, i, &name, &mut out);
                        }
                        continue;
                    }
                    None => warn(warnings, src, i, WarningKind::UnterminatedTag),
                }
            }
        }

        // Plain text up to the next `<`. Always consume at least one char so
        // a `<` that did not open anything becomes text.
        let first = src[i..].chars().next().map_or(1, char::len_utf8);
        let next = src[i + first..]
            .find('<')
            .map_or(bytes.len(), |p| i + first + p);
        out.push(Token::Text(src[i..next].to_string()));
        i = next;
    }

    out
}

fn starts_with(bytes: &[u8], i: usize, pat: &[u8]) -> bool {
    bytes.len() >= i + pat.len() && &bytes[i..i + pat.len()] == pat
}

/// Find `close` at or after `from`. Returns the offset just past it, or the
/// end of input when it is missing.
fn find_close(src: &str, from: usize, close: &str) -> (usize, bool) {
    match src.get(from..).and_then(|rest| rest.find(close)) {
        Some(pos) => (from + pos + close.len(), true),
        None => (src.len(), false),
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b':' | b'-' | b'_' | b'.')
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Parse `<name attr="v" ...>` starting at `start` (which points at `<`).
/// Returns `None` when input ends before the closing `>`.
fn parse_start_tag(src: &str, start: usize) -> Option<(String, Vec<Attribute>, bool, usize)> {
    let bytes = src.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name = src[start + 1..i].to_ascii_lowercase();
    let mut attrs = Vec::new();

    loop {
        i = skip_whitespace(bytes, i);
        if i >= bytes.len() {
            return None;
        }
        if starts_with(bytes, i, b"/>") {
            return Some((name, attrs, true, i + 2));
        }
        match bytes[i] {
            b'>' => return Some((name, attrs, false, i + 1)),
            b'/' | b'=' => {
                i += 1;
                continue;
            }
            _ => {}
        }

        // Attribute name; a `<% %>` block in attribute position is kept whole.
        let name_start = i;
        if starts_with(bytes, i, b"<%") {
            let (end, closed) = find_close(src, i + 2, "%>");
            if !closed {
                return None;
            }
            i = end;
        } else {
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && !matches!(bytes[i], b'=' | b'>' | b'/')
            {
                i += 1;
            }
        }
        let attr_name = src[name_start..i].to_string();

        let after_name = skip_whitespace(bytes, i);
        if after_name < bytes.len() && bytes[after_name] == b'=' {
            let value_start = skip_whitespace(bytes, after_name + 1);
            if value_start >= bytes.len() {
                return None;
            }
            let quote = bytes[value_start];
            let value = if quote == b'"' || quote == b'\'' {
                let close = find_value_end(src, value_start + 1, quote)?;
                i = close + 1;
                src[value_start + 1..close].to_string()
            } else {
                i = value_start;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                src[value_start..i].to_string()
            };
            attrs.push(Attribute {
                name: attr_name,
                value: Some(value),
            });
        } else {
            attrs.push(Attribute {
                name: attr_name,
                value: None,
            });
        }
    }
}

/// Offset of the quote closing a value that starts at `from`. Quotes inside
/// `<% %>` spans belong to the server expression and are skipped.
fn find_value_end(src: &str, from: usize, quote: u8) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == quote {
            return Some(i);
        }
        if starts_with(bytes, i, b"<%") {
            let (end, closed) = find_close(src, i + 2, "%>");
            if !closed {
                return None;
            }
            i = end;
        } else {
            i += 1;
        }
    }
    None
}

/// Parse `</name ...>`. Returns `None` if there is no name or no `>`.
fn parse_end_tag(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut i = start + 2;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    if i == start + 2 {
        return None;
    }
    let name = String::from_utf8_lossy(&bytes[start + 2..i]).to_ascii_lowercase();
    let gt = bytes[i..].iter().position(|&b| b == b'>')?;
    Some((name, i + gt + 1))
}

fn is_raw_text_tag(name: &str) -> bool {
    matches!(name, "script" | "style")
}

/// Emit everything up to `</name` as a single text token, then the end tag.
fn take_raw_text(src: &str, from: usize, name: &str, out: &mut Vec<Token>) -> usize {
    let closing = format!("</{name}");
    let bytes = src.as_bytes();
    let found = (from..bytes.len()).find(|&p| {
        bytes.len() - p >= closing.len()
            && bytes[p..p + closing.len()].eq_ignore_ascii_case(closing.as_bytes())
    });

    let text_end = found.unwrap_or(bytes.len());
    if text_end > from {
        out.push(Token::Text(src[from..text_end].to_string()));
    }
    match found.and_then(|p| parse_end_tag(bytes, p).map(|(n, next)| (p, n, next))) {
        Some((offset, name, next)) => {
            out.push(Token::End { name, offset });
            next
        }
        None => text_end,
    }
}

/// Whether `</name>` shows up before another `<name>` does.
fn has_explicit_end(rest: &[Token], name: &str) -> bool {
    rest.iter()
        .find_map(|token| match token {
            Token::End { name: n, .. } if n == name => Some(true),
            Token::Start { name: n, .. } if n == name => Some(false),
            _ => None,
        })
        .unwrap_or(false)
}

struct Open {
    element: Element,
    offset: usize,
}

fn build_tree(src: &str, tokens: Vec<Token>, warnings: &mut Vec<ParseWarning>) -> Document {
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<Open> = Vec::new();

    fn append(root: &mut Vec<Node>, stack: &mut [Open], node: Node) {
        let children = match stack.last_mut() {
            Some(open) => &mut open.element.children,
            None => root,
        };
        if let Node::Text(text) = &node {
            if let Some(Node::Text(prev)) = children.last_mut() {
                prev.push_str(text);
                return;
            }
        }
        children.push(node);
    }

    let mut tokens = tokens.into_iter();
    while let Some(token) = tokens.next() {
        match token {
            Token::Text(text) => append(&mut root, &mut stack, Node::Text(text)),
            Token::Verbatim(node) => append(&mut root, &mut stack, node),
            Token::Start {
                name,
                attrs,
                self_closing,
                offset,
            } => {
                let element = Element {
                    name,
                    attrs,
                    children: Vec::new(),
                };
                let childless = is_void(&element.name)
                    && !has_explicit_end(tokens.as_slice(), &element.name);
                if self_closing || childless {
                    append(&mut root, &mut stack, Node::Element(element));
                } else {
                    stack.push(Open { element, offset });
                }
            }
            Token::End { name, offset } => {
                let Some(pos) = stack.iter().rposition(|o| o.element.name == name) else {
                    if !is_void(&name) {
                        warn(warnings, src, offset, WarningKind::StrayEndTag { name });
                    }
                    continue;
                };
                while stack.len() > pos {
                    let Some(open) = stack.pop() else { break };
                    if stack.len() > pos {
                        warn(
                            warnings,
                            src,
                            open.offset,
                            WarningKind::ImplicitlyClosed {
                                name: open.element.name.clone(),
                                by: name.clone(),
                            },
                        );
                    }
                    append(&mut root, &mut stack, Node::Element(open.element));
                }
            }
        }
    }

    while let Some(open) = stack.pop() {
        warn(
            warnings,
            src,
            open.offset,
            WarningKind::UnclosedElement {
                name: open.element.name.clone(),
            },
        );
        append(&mut root, &mut stack, Node::Element(open.element));
    }

    Document { children: root }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &Node) -> &Element {
        match node {
            Node::Element(el) => el,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn parses_nested_elements_and_text() {
        let (doc, warnings) = parse("<div id=\"main\"><p>hi</p>tail</div>");
        assert!(warnings.is_empty());
        assert_eq!(doc.children.len(), 1);
        let div = element(&doc.children[0]);
        assert_eq!(div.name, "div");
        assert_eq!(div.attr("id"), Some("main"));
        assert_eq!(div.children.len(), 2);
        let p = element(&div.children[0]);
        assert_eq!(p.children, vec![Node::Text("hi".to_string())]);
        assert_eq!(div.children[1], Node::Text("tail".to_string()));
    }

    #[test]
    fn lowercases_tag_names_but_not_attribute_names() {
        let (doc, _) = parse("<asp:Button Text=\"Go\" runat=\"server\" />");
        let el = element(&doc.children[0]);
        assert_eq!(el.name, "asp:button");
        assert_eq!(el.attrs[0].name, "Text");
        assert_eq!(el.attr("text"), Some("Go"));
    }

    #[test]
    fn keeps_unknown_tags() {
        let (doc, warnings) = parse("<uc:Nav runat=\"server\"></uc:Nav><my-widget/>");
        assert!(warnings.is_empty());
        assert_eq!(element(&doc.children[0]).name, "uc:nav");
        assert_eq!(element(&doc.children[1]).name, "my-widget");
    }

    #[test]
    fn attribute_forms() {
        let (doc, _) = parse("<input type=text disabled value='a \"b\"' data-x = \"1\">");
        let el = element(&doc.children[0]);
        assert_eq!(el.attr("type"), Some("text"));
        assert_eq!(el.attrs[1].value, None);
        assert_eq!(el.attr("disabled"), Some(""));
        assert_eq!(el.attr("value"), Some("a \"b\""));
        assert_eq!(el.attr("data-x"), Some("1"));
    }

    #[test]
    fn quoted_value_may_contain_angle_brackets() {
        let (doc, warnings) = parse("<asp:Label Text='<%# Eval(\"Name\") %>' runat=\"server\"></asp:Label>");
        assert!(warnings.is_empty());
        let el = element(&doc.children[0]);
        assert_eq!(el.attr("Text"), Some("<%# Eval(\"Name\") %>"));
        assert!(el.has_attr("runat"));
    }

    #[test]
    fn double_quoted_value_with_quoted_server_expression() {
        let (doc, warnings) =
            parse("<asp:Label Text=\"<%# Eval(\"Name\") %>\" runat=\"server\" /><p>after</p>");
        assert!(warnings.is_empty());
        assert_eq!(doc.children.len(), 2);
        let label = element(&doc.children[0]);
        assert_eq!(label.attr("Text"), Some("<%# Eval(\"Name\") %>"));
        assert_eq!(label.attr("runat"), Some("server"));
        assert!(label.children.is_empty());
        assert_eq!(element(&doc.children[1]).name, "p");
    }

    #[test]
    fn unterminated_server_block_in_value_leaves_tag_open() {
        let (doc, warnings) = parse("<a href=\"<%= Url");
        assert_eq!(
            doc.children,
            vec![
                Node::Text("<a href=\"".to_string()),
                Node::ServerBlock("<%= Url".to_string())
            ]
        );
        assert_eq!(warnings[0].kind, WarningKind::UnterminatedTag);
        assert_eq!(warnings[1].kind, WarningKind::UnterminatedServerBlock);
    }

    #[test]
    fn void_element_with_end_tag_keeps_children() {
        let (doc, warnings) = parse("<input ID=\"notes\">init</input><p>x</p>");
        assert!(warnings.is_empty());
        assert_eq!(doc.children.len(), 2);
        let input = element(&doc.children[0]);
        assert_eq!(input.children, vec![Node::Text("init".to_string())]);
    }

    #[test]
    fn void_end_tag_after_next_same_start_is_ignored() {
        let (doc, warnings) = parse("<br>a<br>b</br>");
        assert!(warnings.is_empty());
        assert!(element(&doc.children[0]).children.is_empty());
        let second = element(&doc.children[2]);
        assert_eq!(second.children, vec![Node::Text("b".to_string())]);
    }

    #[test]
    fn void_elements_take_no_children() {
        let (doc, warnings) = parse("<p>a<br>b<img src=\"x.png\">c</p>");
        assert!(warnings.is_empty());
        let p = element(&doc.children[0]);
        assert_eq!(p.children.len(), 5);
    }

    #[test]
    fn server_blocks_are_verbatim() {
        let (doc, _) = parse("<p><%= Model.Title %></p><% if (x) { %>y<% } %>");
        let p = element(&doc.children[0]);
        assert_eq!(p.children, vec![Node::ServerBlock("<%= Model.Title %>".to_string())]);
        assert_eq!(doc.children[1], Node::ServerBlock("<% if (x) { %>".to_string()));
        assert_eq!(doc.children[2], Node::Text("y".to_string()));
    }

    #[test]
    fn doctype_is_a_declaration() {
        let (doc, _) = parse("<!DOCTYPE html>\n<html></html>");
        assert_eq!(doc.children[0], Node::Declaration("<!DOCTYPE html>".to_string()));
    }

    #[test]
    fn script_content_is_raw_text() {
        let (doc, warnings) = parse("<script>if (a < b) { x = '<p>'; }</script>");
        assert!(warnings.is_empty());
        let script = element(&doc.children[0]);
        assert_eq!(
            script.children,
            vec![Node::Text("if (a < b) { x = '<p>'; }".to_string())]
        );
    }

    #[test]
    fn unclosed_element_is_closed_at_end_of_input() {
        let (doc, warnings) = parse("<div>\n<span>text");
        let div = element(&doc.children[0]);
        let span = element(&div.children[1]);
        assert_eq!(span.children, vec![Node::Text("text".to_string())]);
        assert_eq!(warnings.len(), 2);
        assert_eq!(
            warnings[0],
            ParseWarning {
                line: 1,
                kind: WarningKind::UnclosedElement { name: "div".into() }
            }
        );
        assert_eq!(
            warnings[1],
            ParseWarning {
                line: 2,
                kind: WarningKind::UnclosedElement { name: "span".into() }
            }
        );
    }

    #[test]
    fn ancestor_end_tag_closes_children() {
        let (doc, warnings) = parse("<div><b>bold</div>after");
        let div = element(&doc.children[0]);
        assert_eq!(element(&div.children[0]).name, "b");
        assert_eq!(doc.children[1], Node::Text("after".to_string()));
        assert_eq!(
            warnings,
            vec![ParseWarning {
                line: 1,
                kind: WarningKind::ImplicitlyClosed {
                    name: "b".into(),
                    by: "div".into()
                }
            }]
        );
    }

    #[test]
    fn stray_end_tag_is_dropped() {
        let (doc, warnings) = parse("<p>a</span></p>");
        let p = element(&doc.children[0]);
        assert_eq!(p.children, vec![Node::Text("a".to_string())]);
        assert_eq!(
            warnings,
            vec![ParseWarning {
                line: 1,
                kind: WarningKind::StrayEndTag { name: "span".into() }
            }]
        );
    }

    #[test]
    fn unterminated_tag_becomes_text() {
        let (doc, warnings) = parse("a <div class=\"x\"");
        assert_eq!(doc.children, vec![Node::Text("a <div class=\"x\"".to_string())]);
        assert_eq!(warnings[0].kind, WarningKind::UnterminatedTag);
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let (doc, warnings) = parse("1 < 2 and 3 > 2");
        assert!(warnings.is_empty());
        assert_eq!(doc.children, vec![Node::Text("1 < 2 and 3 > 2".to_string())]);
    }

    #[test]
    fn unterminated_server_block_runs_to_end() {
        let (doc, warnings) = parse("<p>x</p><%= oops");
        assert_eq!(doc.children[1], Node::ServerBlock("<%= oops".to_string()));
        assert_eq!(warnings[0].kind, WarningKind::UnterminatedServerBlock);
    }

    #[test]
    fn non_ascii_text_is_preserved() {
        let (doc, warnings) = parse("<p>héllo – wörld</p>ü<");
        assert!(warnings.is_empty());
        let p = element(&doc.children[0]);
        assert_eq!(p.children, vec![Node::Text("héllo – wörld".to_string())]);
        assert_eq!(doc.children[1], Node::Text("ü<".to_string()));
    }
}
