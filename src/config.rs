//! Configuration types for Markdown-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across calls, serialise them for logging, and
//! diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A ten-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::BundleError;
use crate::pipeline::render::PdfRenderer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a Markdown-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use mdbundle::{ConversionConfig, PaperSize};
///
/// let config = ConversionConfig::builder()
///     .paper(PaperSize::Letter)
///     .margin_mm(20)
///     .image_concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Paper size for the paginated output. Default: [`PaperSize::A4`].
    ///
    /// Applied through an `@page { size: … }` rule in the document shell, so
    /// it works with any CSS-paged renderer rather than being a
    /// renderer-specific flag.
    pub paper: PaperSize,

    /// Page margin in millimetres (all four sides). Range: 0–50. Default: 15.
    pub margin_mm: u32,

    /// Replacement stylesheet for the document shell. If `None`, the built-in
    /// print-oriented stylesheet is used. The `@page` rule derived from
    /// `paper`/`margin_mm` is always emitted regardless.
    pub stylesheet: Option<String>,

    /// Document title placed in the shell `<title>`. If `None`, the root
    /// file's stem is used.
    pub title: Option<String>,

    /// Number of concurrent image embeds per document. Default: 8.
    ///
    /// Remote images are network-bound; embedding them in parallel cuts
    /// wall-clock time on image-heavy pages. All embeds for a document
    /// settle before that document's fragment is considered final, so this
    /// never affects output ordering.
    pub image_concurrency: usize,

    /// Timeout for a single remote image fetch in seconds. Default: 30.
    pub fetch_timeout_secs: u64,

    /// Timeout for the PDF renderer process in seconds. Default: 120.
    pub render_timeout_secs: u64,

    /// Cap on the number of distinct documents flattened. Default: `None`
    /// (unbounded).
    ///
    /// The traversal itself is bounded only by available memory; a
    /// pathological graph with very wide fan-out can pull in thousands of
    /// files. When the cap is hit, links to unseen documents are left
    /// untouched and a [`crate::ConversionWarning::DocumentLimitReached`]
    /// is recorded.
    pub max_documents: Option<usize>,

    /// Explicit path to a Chromium/Chrome binary. If `None`, the binary is
    /// discovered via `$MDBUNDLE_CHROMIUM` and then well-known names on
    /// `$PATH`.
    pub chromium_path: Option<PathBuf>,

    /// Pre-constructed PDF renderer. Takes precedence over `chromium_path`
    /// and discovery. Useful in tests or when the caller drives a browser
    /// pool of its own.
    pub renderer: Option<Arc<dyn PdfRenderer>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            paper: PaperSize::default(),
            margin_mm: 15,
            stylesheet: None,
            title: None,
            image_concurrency: 8,
            fetch_timeout_secs: 30,
            render_timeout_secs: 120,
            max_documents: None,
            chromium_path: None,
            renderer: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("paper", &self.paper)
            .field("margin_mm", &self.margin_mm)
            .field("stylesheet", &self.stylesheet.as_ref().map(|s| s.len()))
            .field("title", &self.title)
            .field("image_concurrency", &self.image_concurrency)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("max_documents", &self.max_documents)
            .field("chromium_path", &self.chromium_path)
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn PdfRenderer>"))
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn paper(mut self, paper: PaperSize) -> Self {
        self.config.paper = paper;
        self
    }

    pub fn margin_mm(mut self, mm: u32) -> Self {
        self.config.margin_mm = mm.min(50);
        self
    }

    pub fn stylesheet(mut self, css: impl Into<String>) -> Self {
        self.config.stylesheet = Some(css.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn image_concurrency(mut self, n: usize) -> Self {
        self.config.image_concurrency = n.max(1);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn max_documents(mut self, cap: usize) -> Self {
        self.config.max_documents = Some(cap);
        self
    }

    pub fn chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chromium_path = Some(path.into());
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PdfRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, BundleError> {
        let c = &self.config;
        if c.margin_mm > 50 {
            return Err(BundleError::InvalidConfig(format!(
                "margin must be 0–50 mm, got {}",
                c.margin_mm
            )));
        }
        if c.image_concurrency == 0 {
            return Err(BundleError::InvalidConfig(
                "image concurrency must be ≥ 1".into(),
            ));
        }
        if let Some(0) = c.max_documents {
            return Err(BundleError::InvalidConfig(
                "document limit must be ≥ 1 (the root always counts)".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Paper size for the paginated output.
///
/// Maps one-to-one onto the CSS `@page size` keywords, which every
/// CSS-paged renderer understands. Margins are configured separately via
/// [`ConversionConfig::margin_mm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    /// ISO A4, 210 × 297 mm. (default)
    #[default]
    A4,
    /// ISO A3, 297 × 420 mm.
    A3,
    /// ISO A5, 148 × 210 mm.
    A5,
    /// US Letter, 8.5 × 11 in.
    Letter,
    /// US Legal, 8.5 × 14 in.
    Legal,
}

impl PaperSize {
    /// The CSS `@page size` keyword for this paper size.
    pub fn css_keyword(self) -> &'static str {
        match self {
            PaperSize::A4 => "A4",
            PaperSize::A3 => "A3",
            PaperSize::A5 => "A5",
            PaperSize::Letter => "letter",
            PaperSize::Legal => "legal",
        }
    }
}
