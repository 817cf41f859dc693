//! Merger — serialized markup followed by the generated code block.

use crate::codebehind::ExtractedLogic;
use crate::markup::Document;

const INDENT: &str = "    ";

/// Which Razor directive wraps the generated members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum BlockStyle {
    /// `@functions { ... }`
    #[default]
    Functions,
    /// `@code { ... }`
    Code,
}

impl BlockStyle {
    pub fn open_marker(self) -> &'static str {
        match self {
            BlockStyle::Functions => "@functions {",
            BlockStyle::Code => "@code {",
        }
    }

    pub fn close_marker(self) -> &'static str {
        "}"
    }
}

/// Serialize `document` and append the generated block.
///
/// The block is always emitted, empty or not: properties first in source
/// order, then handler stubs in first-seen order, one per indented line.
pub fn merge(document: &Document, logic: &ExtractedLogic, style: BlockStyle) -> String {
    let mut out = document.to_html();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }

    out.push_str(style.open_marker());
    out.push('\n');
    for property in &logic.properties {
        out.push_str(INDENT);
        out.push_str(property);
        out.push('\n');
    }
    for (_, stub) in logic.handlers.iter() {
        out.push_str(INDENT);
        out.push_str(stub);
        out.push('\n');
    }
    out.push_str(style.close_marker());
    out.push('\n');
    out
}
