//! Output types: the assembled document, per-run statistics, and warnings.

use crate::error::ConversionWarning;
use serde::{Deserialize, Serialize};

/// The result of a successful conversion.
///
/// `html` is fully self-contained: every image is an inline `data:` URI and
/// every internal link targets an anchor inside the same document, so the
/// value can be rendered, archived, or mailed without any sidecar files.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// The assembled, self-contained HTML document.
    pub html: String,
    /// Document title (caller-supplied or derived from the root file name).
    pub title: String,
    /// Aggregate statistics for the run.
    pub stats: ConversionStats,
    /// Non-fatal degradations recorded during the run.
    pub warnings: Vec<ConversionWarning>,
}

/// Aggregate statistics for one conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Distinct documents flattened into the output (root included).
    pub documents: usize,
    /// Images successfully embedded as `data:` URIs.
    pub images_embedded: usize,
    /// Images left un-embedded after a read or fetch failure.
    pub images_failed: usize,
    /// Internal links rewritten to intra-document anchors.
    pub links_rewritten: usize,
    /// Internal links whose target file no longer exists.
    pub links_missing: usize,
    /// Wall-clock duration of the whole conversion in milliseconds.
    pub total_duration_ms: u64,
    /// Time spent traversing and rewriting the document graph.
    pub flatten_duration_ms: u64,
    /// Time spent in the PDF renderer (0 for HTML-only conversions).
    pub render_duration_ms: u64,
}
