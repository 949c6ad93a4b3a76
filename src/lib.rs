//! # mdbundle
//!
//! Flatten a graph of linked Markdown documents into one self-contained,
//! paginated PDF.
//!
//! ## Why this crate?
//!
//! Markdown documentation rarely lives in one file — a README links to a
//! setup guide, which links to an FAQ, which links back. Printing or
//! archiving such a corpus file-by-file loses the cross-references and the
//! images. Instead this crate walks the link graph from a root document,
//! merges every reachable file into a single HTML body, inlines every image
//! (local or remote) as a `data:` URI, and rewrites inter-document links
//! into anchors that keep working inside the flattened output.
//!
//! ## Pipeline Overview
//!
//! ```text
//! root.md
//!  │
//!  ├─ 1. Flatten   DFS over internal links; one stable id per document
//!  ├─ 2. Parse     Markdown → structural tree (pulldown-cmark)
//!  ├─ 3. Embed     images → base64 data: URIs (fs reads + HTTP fetches)
//!  ├─ 4. Rewrite   inter-document links → #idN anchors; headings → slugs
//!  ├─ 5. Assemble  HTML shell with print CSS and page-break markers
//!  └─ 6. Render    headless Chromium → paginated PDF
//! ```
//!
//! Cycles are broken by the identifier map: every distinct file is rendered
//! exactly once, no matter how often it is referenced. A missing linked file
//! or an unreachable image degrades to a warning — only an unreadable root
//! aborts the conversion.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mdbundle::{convert_to_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let stats = convert_to_file("docs/README.md", "docs/manual.pdf", &config).await?;
//!     eprintln!(
//!         "{} documents, {} images embedded",
//!         stats.documents, stats.images_embedded
//!     );
//!     Ok(())
//! }
//! ```
//!
//! Use [`convert`] instead when you only need the self-contained HTML — it
//! requires no browser at all.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mdbundle` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! mdbundle = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PaperSize};
pub use convert::{convert, convert_sync, convert_to_file};
pub use error::{BundleError, ConversionWarning};
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::render::{ChromiumRenderer, PdfRenderer};
