//! Error types for the mdbundle library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`BundleError`] — **Fatal**: the conversion cannot proceed at all
//!   (root document unreadable, no PDF renderer available, output path not
//!   writable). Returned as `Err(BundleError)` from the top-level `convert*`
//!   functions.
//!
//! * [`ConversionWarning`] — **Non-fatal**: one image could not be embedded,
//!   or one linked document has gone missing, but the rest of the graph is
//!   fine. Collected into [`crate::output::ConversionOutput::warnings`] so
//!   callers can inspect partial degradation rather than losing the whole
//!   bundle to one bad reference.
//!
//! The separation lets callers decide their own tolerance: treat any warning
//! as an error, log and continue, or surface a post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the mdbundle library.
///
/// Per-reference failures use [`ConversionWarning`] and are collected in
/// [`crate::output::ConversionOutput`] rather than propagated here.
#[derive(Debug, Error)]
pub enum BundleError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The root document was not found or could not be read.
    ///
    /// Missing *linked* documents are tolerated (their subtree is omitted);
    /// only the root is load-bearing.
    #[error("root document not found: '{path}'\nCheck the path exists and is readable.")]
    RootNotFound { path: PathBuf },

    // ── Renderer errors ───────────────────────────────────────────────────
    /// No PDF renderer could be located on this machine.
    #[error(
        "no headless browser found for PDF output\n\
         Searched: explicit --chromium path, $MDBUNDLE_CHROMIUM, and well-known \
         binary names on $PATH ({searched}).\n\
         Install Chromium or Google Chrome, or point MDBUNDLE_CHROMIUM at an \
         existing binary."
    )]
    RendererNotFound { searched: String },

    /// The renderer process ran but failed to produce output.
    #[error("PDF rendering failed: {detail}")]
    RenderFailed { detail: String },

    /// The renderer process exceeded the configured timeout.
    #[error("PDF rendering timed out after {secs}s\nIncrease --render-timeout.")]
    RenderTimeout { secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal degradation recorded during conversion.
///
/// The conversion as a whole succeeds whenever the root is readable and a
/// renderer is available; everything listed here was recovered locally.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ConversionWarning {
    /// A local read or remote fetch failed for one image. The original
    /// source reference was left in place with a visible inline marker.
    #[error("image unavailable in '{document}': {src}: {reason}")]
    ImageUnavailable {
        document: PathBuf,
        src: String,
        reason: String,
    },

    /// An internal link points at a document that does not exist (any more).
    /// The link was left un-rewritten and its subtree omitted.
    #[error("linked document missing in '{document}': {target}")]
    LinkedDocumentMissing { document: PathBuf, target: String },

    /// The visited-document cap was reached; further unseen link targets
    /// were left un-rewritten and not flattened.
    #[error("document limit reached ({limit}); remaining links left untouched")]
    DocumentLimitReached { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_not_found_display() {
        let e = BundleError::RootNotFound {
            path: PathBuf::from("/tmp/gone.md"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/tmp/gone.md"), "got: {msg}");
    }

    #[test]
    fn renderer_not_found_mentions_env_var() {
        let e = BundleError::RendererNotFound {
            searched: "chromium, google-chrome".into(),
        };
        assert!(e.to_string().contains("MDBUNDLE_CHROMIUM"));
        assert!(e.to_string().contains("chromium, google-chrome"));
    }

    #[test]
    fn image_warning_display() {
        let w = ConversionWarning::ImageUnavailable {
            document: PathBuf::from("/docs/a.md"),
            src: "img/logo.png".into(),
            reason: "No such file or directory".into(),
        };
        let msg = w.to_string();
        assert!(msg.contains("img/logo.png"));
        assert!(msg.contains("/docs/a.md"));
    }

    #[test]
    fn missing_document_warning_display() {
        let w = ConversionWarning::LinkedDocumentMissing {
            document: PathBuf::from("/docs/a.md"),
            target: "./deleted.md".into(),
        };
        assert!(w.to_string().contains("./deleted.md"));
    }

    #[test]
    fn warnings_round_trip_as_json() {
        let w = ConversionWarning::DocumentLimitReached { limit: 64 };
        let json = serde_json::to_string(&w).unwrap();
        let back: ConversionWarning = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            back,
            ConversionWarning::DocumentLimitReached { limit: 64 }
        ));
    }
}
