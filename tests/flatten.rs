//! End-to-end tests for mdbundle.
//!
//! Each test builds a real document graph in a temp directory and runs the
//! public `convert`/`convert_to_file` API over it. No browser is involved:
//! PDF-path tests inject a mock renderer through the config seam.

use async_trait::async_trait;
use mdbundle::{
    convert, convert_to_file, BundleError, ConversionConfig, ConversionWarning, PdfRenderer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

async fn convert_default(root: &Path) -> mdbundle::ConversionOutput {
    convert(root, &ConversionConfig::default())
        .await
        .expect("conversion should succeed")
}

/// Position of `needle` in `haystack`, with a readable panic on a miss.
fn pos(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("missing {needle:?} in output:\n{haystack}"))
}

/// Test backend: records the HTML it was handed instead of printing a PDF.
struct HtmlDumpRenderer;

#[async_trait]
impl PdfRenderer for HtmlDumpRenderer {
    async fn render_pdf(&self, html: &str, dest: &Path) -> Result<(), BundleError> {
        tokio::fs::write(dest, html)
            .await
            .map_err(|e| BundleError::OutputWriteFailed {
                path: dest.to_path_buf(),
                source: e,
            })
    }
}

// ── Graph traversal ──────────────────────────────────────────────────────────

#[tokio::test]
async fn single_document_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "doc.md", "# Title\n\nSome **bold** prose.");

    let output = convert_default(&root).await;
    assert!(output.html.contains(r#"<section class="document" id="id0">"#));
    assert!(output.html.contains("<strong>bold</strong>"));
    assert_eq!(output.stats.documents, 1);
    assert_eq!(output.stats.links_rewritten, 0);
    assert!(output.warnings.is_empty());
}

#[tokio::test]
async fn dfs_discovery_order_assigns_sequential_ids() {
    // R → [B, C], B → [D]  ⇒  R=0, B=1, C=2, D=3
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "r.md", "R-ROOT\n\n[b](./b.md) [c](./c.md)");
    write(dir.path(), "b.md", "B-CHILD\n\n[d](./d.md)");
    write(dir.path(), "c.md", "C-CHILD");
    write(dir.path(), "d.md", "D-GRANDCHILD");

    let output = convert_default(&root).await;
    let html = &output.html;
    assert_eq!(output.stats.documents, 4);

    // Fragments concatenated in id order…
    assert!(pos(html, r#"id="id0""#) < pos(html, r#"id="id1""#));
    assert!(pos(html, r#"id="id1""#) < pos(html, r#"id="id2""#));
    assert!(pos(html, r#"id="id2""#) < pos(html, r#"id="id3""#));
    // …and each id holds the expected document.
    assert!(pos(html, r#"id="id1""#) < pos(html, "B-CHILD"));
    assert!(pos(html, "B-CHILD") < pos(html, r#"id="id2""#));
    assert!(pos(html, r#"id="id3""#) < pos(html, "D-GRANDCHILD"));

    // Links rewritten to the target containers.
    assert!(html.contains(r##"<a href="#id1">b</a>"##));
    assert!(html.contains(r##"<a href="#id2">c</a>"##));
    assert!(html.contains(r##"<a href="#id3">d</a>"##));
}

#[tokio::test]
async fn cyclic_graphs_terminate_with_one_fragment_per_document() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.md", "A-BODY\n\n[next](./b.md)");
    write(dir.path(), "b.md", "B-BODY\n\n[back](./a.md)");

    let output = convert_default(&a).await;
    assert_eq!(output.stats.documents, 2);
    assert_eq!(output.html.matches("A-BODY").count(), 1);
    assert_eq!(output.html.matches("B-BODY").count(), 1);
    // The back-edge resolves to the root container.
    assert!(output.html.contains(r##"<a href="#id0">back</a>"##));
}

#[tokio::test]
async fn repeated_references_share_one_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(
        dir.path(),
        "r.md",
        "[first](./shared.md) and [again](./shared.md)",
    );
    write(dir.path(), "shared.md", "SHARED-ONCE");

    let output = convert_default(&root).await;
    assert_eq!(output.stats.documents, 2);
    assert_eq!(output.html.matches("SHARED-ONCE").count(), 1);
    assert_eq!(output.html.matches(r##"href="#id1""##).count(), 2);
}

#[tokio::test]
async fn two_spellings_of_one_file_are_one_document() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(
        dir.path(),
        "r.md",
        "[plain](./sub/page.md) [dotted](./sub/../sub/page.md)",
    );
    write(dir.path(), "sub/page.md", "PAGE-ONCE");

    let output = convert_default(&root).await;
    assert_eq!(output.stats.documents, 2);
    assert_eq!(output.html.matches("PAGE-ONCE").count(), 1);
}

#[tokio::test]
async fn fragments_are_separated_by_page_breaks() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "r.md", "[b](./b.md)");
    write(dir.path(), "b.md", "B");

    let output = convert_default(&root).await;
    assert_eq!(
        output.html.matches(r#"<div class="page-break"></div>"#).count(),
        1
    );
}

// ── Link rewriting ───────────────────────────────────────────────────────────

#[tokio::test]
async fn self_link_with_fragment_rewrites_to_bare_fragment() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(
        dir.path(),
        "self.md",
        "# Section\n\n[back](./self.md#section)",
    );

    let output = convert_default(&root).await;
    assert!(output.html.contains(r##"<a href="#section">back</a>"##));
    assert!(!output.html.contains("#id0#"));
}

#[tokio::test]
async fn external_and_anchor_links_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(
        dir.path(),
        "r.md",
        "[site](https://example.com/page) [mail](mailto:a@b.c) \
         [call](tel:+123) [jump](#local)",
    );

    let output = convert_default(&root).await;
    assert!(output.html.contains(r#"href="https://example.com/page""#));
    assert!(output.html.contains(r#"href="mailto:a@b.c""#));
    assert!(output.html.contains(r#"href="tel:+123""#));
    assert!(output.html.contains(r##"href="#local""##));
    assert_eq!(output.stats.links_rewritten, 0);
}

#[tokio::test]
async fn missing_link_target_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(
        dir.path(),
        "r.md",
        "STILL-HERE\n\n[gone](./missing.md) [ok](./b.md)",
    );
    write(dir.path(), "b.md", "B");

    let output = convert_default(&root).await;
    // The dead link is left as authored; the live one is rewritten.
    assert!(output.html.contains(r#"href="./missing.md""#));
    assert!(output.html.contains(r##"href="#id1""##));
    assert!(output.html.contains("STILL-HERE"));
    assert_eq!(output.stats.links_missing, 1);
    assert!(output.warnings.iter().any(|w| matches!(
        w,
        ConversionWarning::LinkedDocumentMissing { target, .. } if target == "./missing.md"
    )));
}

#[tokio::test]
async fn non_markdown_local_links_pass_through_silently() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "r.md", "[data](./data.csv)");

    let output = convert_default(&root).await;
    assert!(output.html.contains(r#"href="./data.csv""#));
    assert!(output.warnings.is_empty());
}

#[tokio::test]
async fn percent_encoded_link_targets_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "r.md", "[spaced](./my%20page.md)");
    write(dir.path(), "my page.md", "SPACED-PAGE");

    let output = convert_default(&root).await;
    assert_eq!(output.stats.documents, 2);
    assert!(output.html.contains("SPACED-PAGE"));
}

// ── Heading anchors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn heading_anchors_are_deterministic_slugs() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "r.md", "# Getting Started!!\n\nbody");

    let first = convert_default(&root).await;
    assert!(first.html.contains(r#"<h1 id="getting-started">"#));

    // Re-running on identical input yields identical output.
    let second = convert_default(&root).await;
    assert_eq!(first.html, second.html);
}

#[tokio::test]
async fn cross_document_headings_stay_addressable() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "r.md", "[guide](./guide.md)");
    write(dir.path(), "guide.md", "## Install Steps");

    let output = convert_default(&root).await;
    assert!(output.html.contains(r#"<h2 id="install-steps">"#));
}

// ── Image embedding ──────────────────────────────────────────────────────────

#[tokio::test]
async fn local_images_are_embedded_relative_to_their_document() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "r.md", "[child](./sub/child.md)");
    write(dir.path(), "sub/child.md", "![pic](./pix.png)");
    std::fs::write(dir.path().join("sub/pix.png"), [0u8, 1, 2, 3]).unwrap();

    let output = convert_default(&root).await;
    assert!(output.html.contains("data:image/png;base64,"));
    assert_eq!(output.stats.images_embedded, 1);
    assert_eq!(output.stats.images_failed, 0);
}

#[tokio::test]
async fn already_embedded_images_are_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let uri = "data:image/gif;base64,R0lGODlhAQABAAAAACw=";
    let root = write(dir.path(), "r.md", &format!("![dot]({uri})"));

    let output = convert_default(&root).await;
    assert!(output.html.contains(uri));
    assert_eq!(output.stats.images_failed, 0);
}

#[tokio::test]
async fn unreachable_image_leaves_marker_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(
        dir.path(),
        "r.md",
        "before\n\n![x](./absent.png)\n\nafter",
    );

    let output = convert_default(&root).await;
    assert!(output.html.contains(r#"src="./absent.png""#));
    assert!(output.html.contains(r#"class="image-error""#));
    assert!(output.html.contains("before"));
    assert!(output.html.contains("after"));
    assert_eq!(output.stats.images_failed, 1);
    assert!(output
        .warnings
        .iter()
        .any(|w| matches!(w, ConversionWarning::ImageUnavailable { .. })));
}

#[tokio::test]
async fn unreachable_remote_image_does_not_abort() {
    let dir = tempfile::tempdir().unwrap();
    // Port 9 (discard) is refused immediately on any sane machine.
    let root = write(
        dir.path(),
        "r.md",
        "SIBLING-TEXT\n\n![remote](http://127.0.0.1:9/logo.png)",
    );

    let output = convert_default(&root).await;
    assert!(output.html.contains(r#"src="http://127.0.0.1:9/logo.png""#));
    assert!(output.html.contains("SIBLING-TEXT"));
    assert_eq!(output.stats.images_failed, 1);
}

// ── Limits and fatal errors ──────────────────────────────────────────────────

#[tokio::test]
async fn document_cap_bounds_the_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(
        dir.path(),
        "r.md",
        "[a](./a.md) [b](./b.md) [c](./c.md)",
    );
    write(dir.path(), "a.md", "A");
    write(dir.path(), "b.md", "B");
    write(dir.path(), "c.md", "C");

    let config = ConversionConfig::builder().max_documents(2).build().unwrap();
    let output = convert(&root, &config).await.unwrap();
    assert_eq!(output.stats.documents, 2);
    assert!(output
        .warnings
        .iter()
        .any(|w| matches!(w, ConversionWarning::DocumentLimitReached { limit: 2 })));
}

#[tokio::test]
async fn missing_root_is_the_only_fatal_graph_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = convert(&dir.path().join("void.md"), &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BundleError::RootNotFound { .. }));
}

// ── Full pipeline with a mock renderer ───────────────────────────────────────

#[tokio::test]
async fn convert_to_file_hands_settled_html_to_the_renderer() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "r.md", "# Top\n\n[b](./b.md)");
    write(dir.path(), "b.md", "![p](./p.png)");
    std::fs::write(dir.path().join("p.png"), [9u8, 9, 9]).unwrap();

    let config = ConversionConfig::builder()
        .renderer(Arc::new(HtmlDumpRenderer))
        .build()
        .unwrap();

    let dest = dir.path().join("out.pdf");
    let stats = convert_to_file(&root, &dest, &config).await.unwrap();
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.images_embedded, 1);

    // Whatever reaches the renderer must be self-contained: every image a
    // data: URI, every internal link an anchor.
    let handed = std::fs::read_to_string(&dest).unwrap();
    assert!(handed.contains("data:image/png;base64,"));
    assert!(handed.contains(r##"href="#id1""##));
    assert!(!handed.contains("./b.md"));
}
