//! Text-level cleanup that runs before the markup is parsed.
//!
//! Removes `<!-- ... -->` comments (including any markup nested inside them)
//! and `<%@ ... %>` page directives together with the single newline that
//! follows a directive.

use regex::Regex;
use std::sync::LazyLock;

static RE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
/// Directives may span lines (`<%@ Page Language="C#"\n Inherits="..." %>`);
/// the first `%>` closes them.
static RE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<%@.*?%>(?:\r?\n)?").unwrap());

/// Strip comments and page directives from raw page markup.
pub fn normalize(raw: &str) -> String {
    let without_comments = RE_COMMENT.replace_all(raw, "");
    RE_DIRECTIVE.replace_all(&without_comments, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_single_line_comment() {
        assert_eq!(normalize("<p>a<!-- note -->b</p>"), "<p>ab</p>");
    }

    #[test]
    fn strips_multiline_comment_with_nested_tags() {
        let input = "<div>\n<!-- old layout\n<asp:Label runat=\"server\" Text=\"x\" />\n<b>bold</b>\n-->\n</div>";
        let result = normalize(input);
        assert_eq!(result, "<div>\n\n</div>");
        assert!(!result.contains("old layout"));
        assert!(!result.contains("asp:Label"));
    }

    #[test]
    fn comments_are_matched_non_greedily() {
        let result = normalize("<!-- a -->keep<!-- b -->");
        assert_eq!(result, "keep");
    }

    #[test]
    fn strips_directive_and_trailing_newline() {
        let input = "<%@ Page Language=\"C#\" AutoEventWireup=\"true\" %>\n<html></html>\n";
        assert_eq!(normalize(input), "<html></html>\n");
    }

    #[test]
    fn strips_only_one_trailing_newline() {
        let input = "<%@ Page %>\n\n<p></p>";
        assert_eq!(normalize(input), "\n<p></p>");
    }

    #[test]
    fn strips_crlf_after_directive() {
        assert_eq!(normalize("<%@ Page %>\r\n<p></p>"), "<p></p>");
    }

    #[test]
    fn strips_multiple_and_multiline_directives() {
        let input = "<%@ Page Language=\"C#\"\n    Inherits=\"Site.Default\" %>\n<%@ Register TagPrefix=\"uc\" Src=\"~/Nav.ascx\" %>\n<main></main>";
        assert_eq!(normalize(input), "<main></main>");
    }

    #[test]
    fn keeps_other_server_blocks() {
        let input = "<p><%= DateTime.Now %></p>";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn noop_without_comments_or_directives() {
        let input = "<div class=\"x\">plain</div>\n";
        assert_eq!(normalize(input), input);
    }
}
