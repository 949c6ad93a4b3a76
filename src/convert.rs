//! Conversion entry points.
//!
//! The primary API is [`convert`] (flatten + assemble, returns the
//! self-contained HTML) and [`convert_to_file`] (additionally drives the PDF
//! renderer and writes the output atomically). Both succeed whenever the
//! root document is readable — per-reference failures are reported as
//! warnings on the output, never as errors.

use crate::config::ConversionConfig;
use crate::error::BundleError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::render::{ChromiumRenderer, PdfRenderer};
use crate::pipeline::{assemble, flatten};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Flatten the document graph rooted at `root` into one self-contained HTML
/// document.
///
/// This is the renderer-free entry point: no browser is needed and no file
/// is written. Use [`convert_to_file`] to produce the PDF.
///
/// # Errors
/// Returns `Err(BundleError)` only for fatal errors — in practice an
/// unreadable root document. Missing linked documents and failed image
/// embeds surface in [`ConversionOutput::warnings`].
pub async fn convert(
    root: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, BundleError> {
    let total_start = Instant::now();
    let root = root.as_ref();
    info!("starting conversion: {}", root.display());

    let flatten_start = Instant::now();
    let flat = flatten::flatten(root, config).await?;
    let flatten_duration_ms = flatten_start.elapsed().as_millis() as u64;

    let title = config
        .title
        .clone()
        .unwrap_or_else(|| flat.title.clone());
    let html = assemble::assemble(&flat.body, &title, config);

    let stats = ConversionStats {
        documents: flat.documents,
        images_embedded: flat.images_embedded,
        images_failed: flat.images_failed,
        links_rewritten: flat.links_rewritten,
        links_missing: flat.links_missing,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        flatten_duration_ms,
        render_duration_ms: 0,
    };

    info!(
        "flattened {} documents in {}ms",
        stats.documents, stats.flatten_duration_ms
    );

    Ok(ConversionOutput {
        html,
        title,
        stats,
        warnings: flat.warnings,
    })
}

/// Convert the document graph rooted at `root` and write a paginated PDF to
/// `output_path`.
///
/// The PDF is produced at a temporary sibling path and renamed into place,
/// so a crashed or killed run never leaves a partial file at the final
/// destination.
///
/// # Errors
/// Everything [`convert`] can return, plus renderer discovery/launch
/// failures and output-path write failures.
pub async fn convert_to_file(
    root: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, BundleError> {
    let total_start = Instant::now();
    let mut output = convert(root, config).await?;
    let renderer = resolve_renderer(config)?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BundleError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension("pdf.tmp");
    let render_start = Instant::now();
    renderer.render_pdf(&output.html, &tmp_path).await?;
    output.stats.render_duration_ms = render_start.elapsed().as_millis() as u64;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| BundleError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "wrote {} ({} documents, {}ms total)",
        path.display(),
        output.stats.documents,
        output.stats.total_duration_ms
    );

    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    root: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, BundleError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BundleError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(convert(root, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the PDF renderer, from most-specific to least-specific.
///
/// 1. **Pre-built renderer** (`config.renderer`) — the caller constructed
///    the backend entirely; we use it as-is. Useful in tests or when the
///    caller manages a browser pool.
/// 2. **Explicit binary** (`config.chromium_path`) — the caller named the
///    browser to run.
/// 3. **Discovery** — `$MDBUNDLE_CHROMIUM`, then well-known binary names on
///    `$PATH`.
fn resolve_renderer(config: &ConversionConfig) -> Result<Arc<dyn PdfRenderer>, BundleError> {
    if let Some(ref renderer) = config.renderer {
        return Ok(Arc::clone(renderer));
    }
    let renderer = ChromiumRenderer::discover(
        config.chromium_path.as_deref(),
        Duration::from_secs(config.render_timeout_secs),
    )?;
    Ok(Arc::new(renderer))
}
