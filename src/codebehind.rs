//! Code-behind extractor.
//!
//! Pulls two things out of a page's `.aspx.cs` file by pattern matching:
//! - `public <Type> <Name>;` fields → `public <Type> <Name> { get; set; }`
//! - `protected void <Name>(object sender, EventArgs e)` handlers →
//!   `public IActionResult <Name>() { return View(); }`
//!
//! Matching is purely textual: no brace depth, no scopes, no comments or
//! string literals are recognized. A field inside a nested class or a
//! commented-out handler is picked up like any other.

use crate::error::{ConvertError, ConvertResult};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

/// Type: identifier with optional dots, one level of generic arguments
/// (no spaces), array brackets and a nullable marker.
static RE_PUBLIC_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bpublic\s+([A-Za-z_][\w.]*(?:<[\w.,<>\[\]?]*>)?(?:\[\])*\??)\s+([A-Za-z_]\w*)\s*;")
        .unwrap()
});

static RE_EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bprotected\s+void\s+([A-Za-z_]\w*)\s*\(\s*object\s+sender\s*,\s*EventArgs\s+e\s*\)")
        .unwrap()
});

/// A public field found in the code-behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDeclaration {
    pub ty: String,
    pub name: String,
}

impl fmt::Display for PropertyDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "public {} {} {{ get; set; }}", self.ty, self.name)
    }
}

/// Handler name → generated action stub.
///
/// Iterates in first-seen order; inserting an existing name replaces its
/// stub but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerStubs {
    order: Vec<String>,
    stubs: HashMap<String, String>,
}

impl HandlerStubs {
    pub fn insert(&mut self, name: impl Into<String>, stub: impl Into<String>) {
        let name = name.into();
        if !self.stubs.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.stubs.insert(name, stub.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.stubs.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(name, stub)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .map(|name| (name.as_str(), self.stubs[name].as_str()))
    }
}

/// Everything the merger needs from a code-behind file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedLogic {
    pub handlers: HandlerStubs,
    /// Rendered accessor declarations, in source order, duplicates kept.
    pub properties: Vec<String>,
}

impl ExtractedLogic {
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty() && self.properties.is_empty()
    }
}

/// Generated replacement for a Web Forms event handler.
pub fn handler_stub(name: &str) -> String {
    format!("public IActionResult {name}() {{ return View(); }}")
}

/// Read and scan a code-behind file.
///
/// A missing file is not an error: pages without code-behind yield empty
/// logic. Any other read failure (permissions, not UTF-8, a directory in the
/// way) is a [`ConvertError::Read`].
pub fn extract_logic(companion: &Path) -> ConvertResult<ExtractedLogic> {
    let source = match fs::read_to_string(companion) {
        Ok(source) => source,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %companion.display(), "no code-behind file");
            return Ok(ExtractedLogic::default());
        }
        Err(source) => {
            return Err(ConvertError::Read {
                path: companion.to_path_buf(),
                source,
            })
        }
    };

    let logic = extract_from_source(&source);
    debug!(
        path = %companion.display(),
        properties = logic.properties.len(),
        handlers = logic.handlers.len(),
        "scanned code-behind"
    );
    Ok(logic)
}

/// Scan code-behind source text.
pub fn extract_from_source(source: &str) -> ExtractedLogic {
    let properties = RE_PUBLIC_FIELD
        .captures_iter(source)
        .map(|caps| {
            PropertyDeclaration {
                ty: caps[1].to_string(),
                name: caps[2].to_string(),
            }
            .to_string()
        })
        .collect();

    let mut handlers = HandlerStubs::default();
    for caps in RE_EVENT_HANDLER.captures_iter(source) {
        let name = &caps[1];
        handlers.insert(name, handler_stub(name));
    }

    ExtractedLogic {
        handlers,
        properties,
    }
}
