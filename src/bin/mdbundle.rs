//! CLI binary for mdbundle.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use mdbundle::{convert, convert_to_file, ConversionConfig, PaperSize};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a document and everything it links to
  mdbundle README.md
  # → README.pdf next to the input

  # Explicit destination
  mdbundle docs/index.md -o manual.pdf

  # Letter paper, wider margins, custom stylesheet
  mdbundle --paper letter --margin-mm 25 --css print.css report.md

  # Self-contained HTML only (no browser needed)
  mdbundle --html-only README.md -o bundle.html

  # Bound pathological link graphs
  mdbundle --max-docs 50 wiki/Home.md

  # Machine-readable stats
  mdbundle --json README.md > stats.json

ENVIRONMENT VARIABLES:
  MDBUNDLE_CHROMIUM   Path to a Chromium/Chrome binary — skips discovery
  MDBUNDLE_OUTPUT     Default output path
  MDBUNDLE_PAPER      Default paper size (a4, a3, a5, letter, legal)

PDF RENDERING:
  The PDF is produced by a headless browser discovered on $PATH (chromium,
  google-chrome, chrome, brave-browser, msedge). Use --chromium or
  MDBUNDLE_CHROMIUM to pick a specific binary. --html-only needs no browser.
"#;

/// Flatten linked Markdown documents into one self-contained PDF.
#[derive(Parser, Debug)]
#[command(
    name = "mdbundle",
    version,
    about = "Flatten linked Markdown documents into one self-contained PDF",
    long_about = "Walk the link graph from a root Markdown document, merge every reachable \
document into a single artifact, inline all images as data: URIs, rewrite cross-document \
links into anchors, and print the result to a paginated PDF.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Root Markdown document.
    input: PathBuf,

    /// Output path. Defaults to the input with a .pdf (or .html) extension.
    #[arg(short, long, env = "MDBUNDLE_OUTPUT")]
    output: Option<PathBuf>,

    /// Emit self-contained HTML instead of PDF (no browser required).
    #[arg(long, env = "MDBUNDLE_HTML_ONLY")]
    html_only: bool,

    /// Paper size.
    #[arg(long, env = "MDBUNDLE_PAPER", value_enum, default_value = "a4")]
    paper: PaperArg,

    /// Page margin in millimetres (0–50).
    #[arg(long, env = "MDBUNDLE_MARGIN_MM", default_value_t = 15,
          value_parser = clap::value_parser!(u32).range(0..=50))]
    margin_mm: u32,

    /// Path to a replacement stylesheet for the document shell.
    #[arg(long, env = "MDBUNDLE_CSS")]
    css: Option<PathBuf>,

    /// Document title. Defaults to the root file name.
    #[arg(long, env = "MDBUNDLE_TITLE")]
    title: Option<String>,

    /// Concurrent image embeds per document.
    #[arg(long, env = "MDBUNDLE_IMAGE_CONCURRENCY", default_value_t = 8)]
    image_concurrency: usize,

    /// Remote image fetch timeout in seconds.
    #[arg(long, env = "MDBUNDLE_FETCH_TIMEOUT", default_value_t = 30)]
    fetch_timeout: u64,

    /// PDF renderer timeout in seconds.
    #[arg(long, env = "MDBUNDLE_RENDER_TIMEOUT", default_value_t = 120)]
    render_timeout: u64,

    /// Cap on the number of documents flattened.
    #[arg(long, env = "MDBUNDLE_MAX_DOCS")]
    max_docs: Option<usize>,

    /// Path to a Chromium/Chrome binary.
    #[arg(long, env = "MDBUNDLE_CHROMIUM")]
    chromium: Option<PathBuf>,

    /// Output statistics as JSON on stdout.
    #[arg(long, env = "MDBUNDLE_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MDBUNDLE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MDBUNDLE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PaperArg {
    A4,
    A3,
    A5,
    Letter,
    Legal,
}

impl From<PaperArg> for PaperSize {
    fn from(v: PaperArg) -> Self {
        match v {
            PaperArg::A4 => PaperSize::A4,
            PaperArg::A3 => PaperSize::A3,
            PaperArg::A5 => PaperSize::A5,
            PaperArg::Letter => PaperSize::Letter,
            PaperArg::Legal => PaperSize::Legal,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;

    // ── HTML-only mode ───────────────────────────────────────────────────
    if cli.html_only {
        let output = convert(&cli.input, &config)
            .await
            .context("Conversion failed")?;

        report_warnings(&output.warnings, cli.quiet);

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?
            );
        } else if let Some(path) = cli.output.as_deref() {
            tokio::fs::write(path, &output.html)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!(
                    "{} {} documents  →  {}",
                    green("✔"),
                    output.stats.documents,
                    bold(&path.display().to_string()),
                );
            }
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.html.as_bytes())
                .context("Failed to write to stdout")?;
        }
        return Ok(());
    }

    // ── PDF mode ─────────────────────────────────────────────────────────
    let dest = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("pdf"));

    let stats = convert_to_file(&cli.input, &dest, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{} {} documents  {} images  {}ms  →  {}",
            if stats.images_failed == 0 && stats.links_missing == 0 {
                green("✔")
            } else {
                yellow("⚠")
            },
            stats.documents,
            stats.images_embedded,
            stats.total_duration_ms,
            bold(&dest.display().to_string()),
        );
        if stats.images_failed > 0 || stats.links_missing > 0 {
            eprintln!(
                "   {}",
                dim(&format!(
                    "{} images failed, {} linked documents missing",
                    stats.images_failed, stats.links_missing
                ))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let stylesheet = if let Some(ref path) = cli.css {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read stylesheet from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = ConversionConfig::builder()
        .paper(cli.paper.clone().into())
        .margin_mm(cli.margin_mm)
        .image_concurrency(cli.image_concurrency)
        .fetch_timeout_secs(cli.fetch_timeout)
        .render_timeout_secs(cli.render_timeout);

    if let Some(cap) = cli.max_docs {
        builder = builder.max_documents(cap);
    }

    let mut config = builder.build().context("Invalid configuration")?;

    // Apply fields the builder wraps in Option
    config.stylesheet = stylesheet;
    config.title = cli.title.clone();
    config.chromium_path = cli.chromium.clone();

    Ok(config)
}

/// Print collected warnings to stderr (suppressed by --quiet).
fn report_warnings(warnings: &[mdbundle::ConversionWarning], quiet: bool) {
    if quiet {
        return;
    }
    for warning in warnings {
        eprintln!("  {} {}", yellow("⚠"), warning);
    }
}
