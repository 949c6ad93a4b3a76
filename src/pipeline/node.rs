//! Document node builder: render one source file into a rewritable fragment.
//!
//! For a single Markdown file this stage produces everything the flattener
//! needs: the parsed body tree with images embedded and heading anchors
//! assigned, plus the ordered list of outbound links into other documents.
//! The final link rewrite is deferred — a target's identifier is only known
//! once the flattener has discovered it — so outbound links carry the index
//! of their link node and the flattener comes back to patch the `href`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::ConversionWarning;
use crate::pipeline::embed::ResourceEmbedder;
use crate::pipeline::markup;
use crate::pipeline::tree::DocumentTree;

/// External link schemes pass through untouched; everything else is a
/// candidate for graph traversal.
static RE_EXTERNAL_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?:|mailto:|tel:)").unwrap());

/// One rendered document, ready for the flattener.
#[derive(Debug)]
pub struct DocumentNode {
    /// Body tree with images embedded and heading anchors assigned.
    pub tree: DocumentTree,
    /// Links into other documents, in appearance order.
    pub outbound: Vec<OutboundLink>,
    /// Non-fatal degradations encountered while building this node.
    pub warnings: Vec<ConversionWarning>,
    /// Images successfully embedded in this document.
    pub images_embedded: usize,
}

/// A link from this document to another document on disk.
#[derive(Debug, Clone)]
pub struct OutboundLink {
    /// Position among the document's link nodes, in appearance order.
    /// Used by the flattener to address the node for the href rewrite.
    pub link_index: usize,
    /// Canonicalised target path.
    pub target: PathBuf,
    /// Fragment suffix carried from the source href (`page.md#section`).
    pub fragment: Option<String>,
}

/// Render one source document.
///
/// Fails only when the file itself cannot be read; the caller decides
/// whether that is fatal (root) or an empty contribution (linked document).
pub async fn render_document(
    path: &Path,
    embedder: &ResourceEmbedder,
    image_concurrency: usize,
) -> std::io::Result<DocumentNode> {
    let source = tokio::fs::read_to_string(path).await?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut tree = markup::parse_document(&source);
    let mut warnings = Vec::new();

    let images_embedded =
        embed_images(&mut tree, path, &base_dir, embedder, image_concurrency, &mut warnings).await;
    assign_heading_anchors(&mut tree);
    let outbound = classify_links(&mut tree, path, &base_dir, &mut warnings);

    debug!(
        "rendered {}: {} outbound links, {} images embedded",
        path.display(),
        outbound.len(),
        images_embedded
    );

    Ok(DocumentNode {
        tree,
        outbound,
        warnings,
        images_embedded,
    })
}

/// Embed every image in the tree, concurrently up to `concurrency`.
///
/// All embeds settle before this function returns, so the fragment never
/// leaves here with in-flight fetches. Failures keep the original source,
/// mark the node for a visible inline warning, and record a
/// [`ConversionWarning::ImageUnavailable`].
async fn embed_images(
    tree: &mut DocumentTree,
    document: &Path,
    base_dir: &Path,
    embedder: &ResourceEmbedder,
    concurrency: usize,
    warnings: &mut Vec<ConversionWarning>,
) -> usize {
    // First pass: collect work. `data:` sources are already embedded and
    // need no job at all.
    let mut jobs: Vec<(usize, String)> = Vec::new();
    {
        let mut idx = 0usize;
        tree.for_each_image_mut(&mut |img| {
            if !img.src.is_empty() && !img.src.starts_with("data:") {
                jobs.push((idx, img.src.clone()));
            }
            idx += 1;
        });
    }

    let results: Vec<(usize, String, Result<String, String>)> =
        stream::iter(jobs.into_iter().map(|(idx, src)| async move {
            let result = embedder
                .embed(&src, base_dir)
                .await
                .map_err(|e| e.to_string());
            (idx, src, result)
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut outcomes: HashMap<usize, (String, Result<String, String>)> = results
        .into_iter()
        .map(|(idx, src, result)| (idx, (src, result)))
        .collect();

    // Second pass: write the settled results back in document order.
    let mut embedded = 0usize;
    let mut idx = 0usize;
    tree.for_each_image_mut(&mut |img| {
        if let Some((src, outcome)) = outcomes.remove(&idx) {
            match outcome {
                Ok(data) => {
                    img.src = data;
                    embedded += 1;
                }
                Err(reason) => {
                    warn!("failed to embed image '{}': {}", src, reason);
                    img.embed_error = Some(reason.clone());
                    warnings.push(ConversionWarning::ImageUnavailable {
                        document: document.to_path_buf(),
                        src,
                        reason,
                    });
                }
            }
        }
        idx += 1;
    });
    embedded
}

/// Give every heading an anchor id so it is a valid jump target after
/// flattening.
///
/// Explicit `{#id}` attributes are kept verbatim. Missing ids are derived
/// from the visible text (`Getting Started!!` → `getting-started`) and
/// deduplicated within the document (`faq`, `faq-1`, `faq-2`).
fn assign_heading_anchors(tree: &mut DocumentTree) {
    let mut used: HashSet<String> = HashSet::new();
    tree.for_each_heading_mut(&mut |heading| match &heading.id {
        Some(id) => {
            used.insert(id.clone());
        }
        None => {
            let base = slug::slugify(&heading.text);
            let base = if base.is_empty() {
                "section".to_string()
            } else {
                base
            };
            let mut id = base.clone();
            let mut n = 1usize;
            while used.contains(&id) {
                id = format!("{base}-{n}");
                n += 1;
            }
            used.insert(id.clone());
            heading.id = Some(id);
        }
    });
}

/// Classify every link and collect the internal-document targets.
///
/// Anchor-only and external links pass through unmodified. Local links that
/// do not point at a Markdown file (a PDF, a source file) also pass through.
/// Markdown targets that no longer exist are left un-rewritten with a
/// [`ConversionWarning::LinkedDocumentMissing`].
fn classify_links(
    tree: &mut DocumentTree,
    document: &Path,
    base_dir: &Path,
    warnings: &mut Vec<ConversionWarning>,
) -> Vec<OutboundLink> {
    let mut outbound = Vec::new();
    let mut idx = 0usize;
    tree.for_each_link_mut(&mut |link| {
        let link_index = idx;
        idx += 1;

        let href = link.href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("//")
            || RE_EXTERNAL_LINK.is_match(href)
        {
            return;
        }

        let (path_part, fragment) = match href.split_once('#') {
            Some((p, f)) => (p, Some(f.to_string())),
            None => (href, None),
        };

        let decoded = percent_encoding::percent_decode_str(path_part)
            .decode_utf8()
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| path_part.to_string());

        if !is_markdown_path(Path::new(&decoded)) {
            return;
        }

        let candidate = if Path::new(&decoded).is_absolute() {
            PathBuf::from(&decoded)
        } else {
            base_dir.join(&decoded)
        };

        match std::fs::canonicalize(&candidate) {
            Ok(resolved) if resolved.is_file() => {
                outbound.push(OutboundLink {
                    link_index,
                    target: resolved,
                    fragment,
                });
            }
            _ => {
                warn!(
                    "link target missing: '{}' (from {})",
                    href,
                    document.display()
                );
                warnings.push(ConversionWarning::LinkedDocumentMissing {
                    document: document.to_path_buf(),
                    target: href.to_string(),
                });
            }
        }
    });
    outbound
}

fn is_markdown_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"))
}
