//! Conversion orchestrator: one page in, one Razor view out.

use crate::codebehind::extract_logic;
use crate::error::{ConvertError, ConvertResult};
use crate::mapper::{map_controls, ControlTagRule, CONTROL_TAG_RULES};
use crate::markup::ParseWarning;
use crate::merge::{merge, BlockStyle};
use crate::normalize::normalize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Page extensions picked up when a directory is given as input.
pub const MARKUP_EXTENSIONS: &[&str] = &["aspx", "ascx", "master"];

/// Appended to a page path to find its code-behind (`Default.aspx.cs`).
pub const CODE_BEHIND_SUFFIX: &str = ".cs";

pub const TARGET_EXTENSION: &str = "cshtml";

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub block: BlockStyle,
    /// Write views here instead of next to their pages.
    pub output_dir: Option<PathBuf>,
    pub rules: &'static [ControlTagRule],
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            block: BlockStyle::default(),
            output_dir: None,
            rules: CONTROL_TAG_RULES,
        }
    }
}

/// A converted page, ready to be written.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Code-behind path that was consulted; it may not exist.
    pub companion: PathBuf,
    pub text: String,
    pub warnings: Vec<ParseWarning>,
}

impl ConversionResult {
    /// Write the view to [`ConversionResult::output`], creating the parent
    /// directory if needed.
    pub fn write(&self) -> ConvertResult<()> {
        let write_err = |source| ConvertError::Write {
            path: self.output.clone(),
            source,
        };
        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&self.output, &self.text).map_err(write_err)
    }
}

pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert one page without touching the output location.
    pub fn convert(&self, input: &Path) -> ConvertResult<ConversionResult> {
        let raw = fs::read_to_string(input).map_err(|source| ConvertError::Read {
            path: input.to_path_buf(),
            source,
        })?;

        let normalized = normalize(&raw);
        let mapped = map_controls(&normalized, self.options.rules);
        for warning in &mapped.warnings {
            warn!(file = %input.display(), "{warning}");
        }

        let companion = companion_path(input);
        let logic = extract_logic(&companion)?;
        let text = merge(&mapped.document, &logic, self.options.block);
        let output = output_path(input, self.options.output_dir.as_deref());
        debug!(
            input = %input.display(),
            output = %output.display(),
            properties = logic.properties.len(),
            handlers = logic.handlers.len(),
            "converted page"
        );

        Ok(ConversionResult {
            input: input.to_path_buf(),
            output,
            companion,
            text,
            warnings: mapped.warnings,
        })
    }

    /// Convert and write every page, in order.
    ///
    /// A failing page is logged and recorded as an `Err` entry; the rest of
    /// the batch still runs. The result has one entry per input.
    pub fn convert_batch(&self, inputs: &[PathBuf]) -> Vec<ConvertResult<ConversionResult>> {
        inputs
            .iter()
            .map(|input| {
                let result = self
                    .convert(input)
                    .and_then(|converted| converted.write().map(|()| converted));
                match &result {
                    Ok(converted) => info!(
                        input = %converted.input.display(),
                        output = %converted.output.display(),
                        "wrote view"
                    ),
                    Err(e) => error!(input = %input.display(), "skipping: {e}"),
                }
                result
            })
            .collect()
    }
}

/// `Default.aspx` → `Default.aspx.cs`.
pub fn companion_path(input: &Path) -> PathBuf {
    let mut path = input.as_os_str().to_os_string();
    path.push(CODE_BEHIND_SUFFIX);
    PathBuf::from(path)
}

/// `pages/default.aspx` → `pages/Default.cshtml`, or `<output_dir>/Default.cshtml`.
///
/// Only the first character of the stem is upper-cased; the rest is kept.
pub fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{}.{}", capitalize_first(&stem), TARGET_EXTENSION);
    let dir = match output_dir {
        Some(dir) => dir,
        None => input.parent().unwrap_or(Path::new("")),
    };
    dir.join(file_name)
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
