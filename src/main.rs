//! razorize — convert ASP.NET Web Forms pages (`.aspx`, `.ascx`, `.master`)
//! into Razor views.
//!
//! `razorize pages/*.aspx` writes `Default.cshtml` next to `default.aspx`,
//! folding public fields and event handlers from `default.aspx.cs` into a
//! trailing `@functions { }` block.

use anyhow::{Context, Result};
use clap::Parser;
use razorize::convert::MARKUP_EXTENSIONS;
use razorize::{BlockStyle, ConvertOptions, Converter};
use std::collections::HashSet;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, warn, Level};

#[derive(Parser)]
#[command(
    name = "razorize",
    about = "Convert ASP.NET Web Forms pages and their code-behind into Razor views"
)]
struct Cli {
    /// Input pages, directories (scanned for .aspx/.ascx/.master) or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write views into this directory instead of next to each page
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Directive wrapping the generated members
    #[arg(short = 'b', long, value_enum, default_value_t = BlockStyle::Functions)]
    block: BlockStyle,

    /// Print converted views to stdout instead of writing files
    #[arg(long, conflicts_with = "output")]
    stdout: bool,

    /// Log per-file progress and parser recovery details
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let inputs = expand_inputs(&cli.inputs)?;
    if inputs.is_empty() {
        anyhow::bail!("no input pages found");
    }

    let converter = Converter::new(ConvertOptions {
        block: cli.block,
        output_dir: cli.output,
        ..ConvertOptions::default()
    });

    let failed = if cli.stdout {
        print_views(&converter, &inputs)?
    } else {
        let results = converter.convert_batch(&inputs);
        let failed = results.iter().filter(|r| r.is_err()).count();
        println!(
            "converted {} of {} file(s)",
            results.len() - failed,
            results.len()
        );
        failed
    };

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// `--stdout` mode: convert without writing. Returns the number of failures.
fn print_views(converter: &Converter, inputs: &[PathBuf]) -> Result<usize> {
    let mut stdout = io::stdout().lock();
    let mut failed = 0;
    for input in inputs {
        match converter.convert(input) {
            Ok(result) => {
                stdout
                    .write_all(result.text.as_bytes())
                    .context("failed to write to stdout")?;
            }
            Err(e) => {
                error!(input = %input.display(), "skipping: {e}");
                failed += 1;
            }
        }
    }
    Ok(failed)
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .without_time()
        .with_writer(io::stderr)
        .init();
}

/// Resolve the command-line inputs into pages, in argument order.
///
/// A directory contributes its pages (non-recursive) and a glob pattern its
/// matches, each group sorted by path. A page named twice is converted once,
/// at its first position.
fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut pages = Vec::new();
    for input in inputs {
        for page in resolve_input(input)? {
            if seen.insert(page.clone()) {
                pages.push(page);
            }
        }
    }
    Ok(pages)
}

fn resolve_input(input: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(input);
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut group: Vec<PathBuf> = if path.is_dir() {
        fs::read_dir(path)
            .with_context(|| format!("failed to read directory: {}", path.display()))?
            .flatten()
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && is_page(p))
            .collect()
    } else {
        let matched: Vec<PathBuf> = glob::glob(input)
            .with_context(|| format!("invalid glob pattern: {input}"))?
            .flatten()
            .filter(|p| p.is_file())
            .collect();
        if matched.is_empty() {
            warn!(pattern = input, "no pages matched");
        }
        matched
    };
    group.sort();
    Ok(group)
}

fn is_page(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            MARKUP_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}
