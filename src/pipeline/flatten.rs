//! Graph flattener: traverse the link graph and merge it into one body.
//!
//! Starting at the root document, this stage drives the node builder over
//! every document reachable through internal links, assigns each distinct
//! file a stable identifier, rewrites inter-document links into
//! intra-document anchors, and concatenates all fragments in id order.
//!
//! The traversal is an explicit stack-driven depth-first walk with a single
//! owned [`IdentifierMap`] rather than a recursive function threading shared
//! state: no deep call stacks on large graphs, and the visited-set invariant
//! is a plain data structure that can be tested in isolation. Identifiers
//! double as the cycle breaker — a path already present in the map is never
//! enqueued again, so `A → B → A` renders A exactly once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ConversionConfig;
use crate::error::{BundleError, ConversionWarning};
use crate::pipeline::embed::ResourceEmbedder;
use crate::pipeline::node;

/// Separator between document fragments; the shell stylesheet turns it into
/// a forced page break.
pub const PAGE_BREAK: &str = r#"<div class="page-break"></div>"#;

/// The flattened document graph, before shell assembly.
#[derive(Debug)]
pub struct FlattenResult {
    /// All fragments in id order, joined by page-break separators.
    pub body: String,
    /// Title derived from the root file name.
    pub title: String,
    /// Distinct documents rendered (root included).
    pub documents: usize,
    pub images_embedded: usize,
    pub images_failed: usize,
    pub links_rewritten: usize,
    pub links_missing: usize,
    /// Non-fatal degradations from the whole traversal.
    pub warnings: Vec<ConversionWarning>,
}

/// Document identity map: canonical path → identifier.
///
/// Identifiers are assigned in strict first-discovery order, root first at
/// 0. Once a path is present it always resolves to the same id, which is
/// what prevents duplicate content and infinite recursion.
#[derive(Debug, Default)]
pub struct IdentifierMap {
    ids: HashMap<PathBuf, usize>,
    order: Vec<PathBuf>,
}

impl IdentifierMap {
    /// Look up a path's id, assigning the next sequential one if unseen.
    /// Returns `(id, newly_assigned)`.
    pub fn get_or_assign(&mut self, path: &Path) -> (usize, bool) {
        if let Some(&id) = self.ids.get(path) {
            return (id, false);
        }
        let id = self.ids.len();
        self.ids.insert(path.to_path_buf(), id);
        self.order.push(path.to_path_buf());
        (id, true)
    }

    pub fn get(&self, path: &Path) -> Option<usize> {
        self.ids.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// The anchor id of a document's wrapper element.
pub fn container_anchor(id: usize) -> String {
    format!("id{id}")
}

/// Flatten the document graph rooted at `root` into one combined body.
///
/// # Errors
/// Only an unreadable *root* is fatal. Missing linked documents and failed
/// image embeds are recovered locally and reported in
/// [`FlattenResult::warnings`].
pub async fn flatten(
    root: &Path,
    config: &ConversionConfig,
) -> Result<FlattenResult, BundleError> {
    let root = tokio::fs::canonicalize(root)
        .await
        .map_err(|_| BundleError::RootNotFound {
            path: root.to_path_buf(),
        })?;
    let embedder = ResourceEmbedder::new(Duration::from_secs(config.fetch_timeout_secs))?;

    let mut ids = IdentifierMap::default();
    let (_root_id, _) = ids.get_or_assign(&root);

    let mut stack: Vec<PathBuf> = vec![root.clone()];
    let mut fragments: Vec<(usize, String)> = Vec::new();
    let mut warnings: Vec<ConversionWarning> = Vec::new();
    let mut images_embedded = 0usize;
    let mut images_failed = 0usize;
    let mut links_rewritten = 0usize;
    let mut links_missing = 0usize;
    let mut limit_reported = false;

    while let Some(path) = stack.pop() {
        let Some(id) = ids.get(&path) else { continue };

        let node = match node::render_document(&path, &embedder, config.image_concurrency).await {
            Ok(node) => node,
            Err(e) => {
                if id == 0 {
                    return Err(BundleError::RootNotFound { path });
                }
                // The target existed at discovery time but is gone now.
                // Contribute an empty container so links to it still land.
                warn!("linked document vanished: {} ({})", path.display(), e);
                warnings.push(ConversionWarning::LinkedDocumentMissing {
                    document: path.clone(),
                    target: path.display().to_string(),
                });
                fragments.push((id, wrap_fragment(id, "")));
                continue;
            }
        };

        for w in &node.warnings {
            match w {
                ConversionWarning::ImageUnavailable { .. } => images_failed += 1,
                ConversionWarning::LinkedDocumentMissing { .. } => links_missing += 1,
                ConversionWarning::DocumentLimitReached { .. } => {}
            }
        }
        images_embedded += node.images_embedded;

        // Resolve every outbound link to an anchor, assigning ids to unseen
        // targets in link-appearance order.
        let mut rewrites: HashMap<usize, String> = HashMap::new();
        let mut new_targets: Vec<PathBuf> = Vec::new();
        for ob in &node.outbound {
            if ob.target == path {
                // Self-link: stay inside this fragment — a bare `#` or the
                // original sub-anchor.
                let href = match &ob.fragment {
                    Some(f) => format!("#{f}"),
                    None => "#".to_string(),
                };
                rewrites.insert(ob.link_index, href);
                links_rewritten += 1;
                continue;
            }
            if let Some(target_id) = ids.get(&ob.target) {
                rewrites.insert(ob.link_index, format!("#{}", container_anchor(target_id)));
                links_rewritten += 1;
            } else if let Some(limit) = config.max_documents.filter(|&l| ids.len() >= l) {
                if !limit_reported {
                    warn!("document limit reached ({limit}); leaving further links untouched");
                    warnings.push(ConversionWarning::DocumentLimitReached { limit });
                    limit_reported = true;
                }
            } else {
                let (target_id, _) = ids.get_or_assign(&ob.target);
                rewrites.insert(ob.link_index, format!("#{}", container_anchor(target_id)));
                links_rewritten += 1;
                new_targets.push(ob.target.clone());
            }
        }

        let mut tree = node.tree;
        let mut idx = 0usize;
        tree.for_each_link_mut(&mut |link| {
            if let Some(href) = rewrites.remove(&idx) {
                link.href = href;
            }
            idx += 1;
        });

        // Depth-first: the first-referenced child is visited before its
        // siblings, so push in reverse appearance order.
        for target in new_targets.into_iter().rev() {
            stack.push(target);
        }

        fragments.push((id, wrap_fragment(id, &tree.to_html())));
        warnings.extend(node.warnings);
    }

    // Concatenate in the exact order ids were assigned.
    fragments.sort_by_key(|(id, _)| *id);
    let documents = fragments.len();
    let body = fragments
        .into_iter()
        .map(|(_, html)| html)
        .collect::<Vec<_>>()
        .join(&format!("\n{PAGE_BREAK}\n"));

    let title = root
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string();

    info!(
        "flattened {} documents ({} links rewritten, {} images embedded)",
        documents, links_rewritten, images_embedded
    );

    Ok(FlattenResult {
        body,
        title,
        documents,
        images_embedded,
        images_failed,
        links_rewritten,
        links_missing,
        warnings,
    })
}

fn wrap_fragment(id: usize, body: &str) -> String {
    format!(
        "<section class=\"document\" id=\"{}\">\n{}</section>",
        container_anchor(id),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn identifier_map_assigns_in_discovery_order() {
        let mut ids = IdentifierMap::default();
        assert_eq!(ids.get_or_assign(Path::new("/r.md")), (0, true));
        assert_eq!(ids.get_or_assign(Path::new("/b.md")), (1, true));
        assert_eq!(ids.get_or_assign(Path::new("/r.md")), (0, false));
        assert_eq!(ids.get_or_assign(Path::new("/c.md")), (2, true));
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn container_anchor_format() {
        assert_eq!(container_anchor(0), "id0");
        assert_eq!(container_anchor(12), "id12");
    }

    #[tokio::test]
    async fn dfs_assigns_ids_in_link_appearance_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(dir.path(), "r.md", "R-BODY [b](./b.md) [c](./c.md)");
        write(dir.path(), "b.md", "B-BODY [d](./d.md)");
        write(dir.path(), "c.md", "C-BODY");
        write(dir.path(), "d.md", "D-BODY");

        let config = ConversionConfig::default();
        let result = flatten(&root, &config).await.unwrap();
        assert_eq!(result.documents, 4);

        // Fragments appear in id order 0..=3, and the ids map to
        // R, B, C, D respectively.
        let pos = |needle: &str| result.body.find(needle).unwrap_or_else(|| {
            panic!("missing {needle:?} in:\n{}", result.body)
        });
        assert!(pos(r#"id="id0""#) < pos(r#"id="id1""#));
        assert!(pos(r#"id="id1""#) < pos(r#"id="id2""#));
        assert!(pos(r#"id="id2""#) < pos(r#"id="id3""#));
        assert!(pos(r#"id="id1""#) < pos("B-BODY") && pos("B-BODY") < pos(r#"id="id2""#));
        assert!(pos(r#"id="id3""#) < pos("D-BODY"));

        // Links rewritten to container anchors.
        assert!(result.body.contains(r##"<a href="#id1">b</a>"##));
        assert!(result.body.contains(r##"<a href="#id2">c</a>"##));
        assert!(result.body.contains(r##"<a href="#id3">d</a>"##));
        assert_eq!(result.links_rewritten, 3);
    }

    #[tokio::test]
    async fn cycles_render_each_document_once() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.md", "A-BODY [to b](./b.md)");
        write(dir.path(), "b.md", "B-BODY [back to a](./a.md)");

        let config = ConversionConfig::default();
        let result = flatten(&a, &config).await.unwrap();
        assert_eq!(result.documents, 2);
        assert_eq!(result.body.matches("<section").count(), 2);
        assert_eq!(result.body.matches("A-BODY").count(), 1);
        assert_eq!(result.body.matches("B-BODY").count(), 1);
        // The back-edge reuses the root's id.
        assert!(result.body.contains(r##"href="#id0""##));
    }

    #[tokio::test]
    async fn self_links_become_bare_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(
            dir.path(),
            "self.md",
            "# Section\n\n[back](./self.md#section)\n\n[top](./self.md)",
        );

        let config = ConversionConfig::default();
        let result = flatten(&a, &config).await.unwrap();
        assert!(result.body.contains(r##"<a href="#section">back</a>"##));
        assert!(result.body.contains(r##"<a href="#">top</a>"##));
    }

    #[tokio::test]
    async fn document_cap_stops_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(dir.path(), "r.md", "[b](./b.md) [c](./c.md)");
        write(dir.path(), "b.md", "B");
        write(dir.path(), "c.md", "C");

        let config = ConversionConfig::builder().max_documents(2).build().unwrap();
        let result = flatten(&root, &config).await.unwrap();
        assert_eq!(result.documents, 2);
        // The second link was left untouched.
        assert!(result.body.contains(r#"href="./c.md""#));
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, ConversionWarning::DocumentLimitReached { limit: 2 })));
    }

    #[tokio::test]
    async fn missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConversionConfig::default();
        let err = flatten(&dir.path().join("absent.md"), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, BundleError::RootNotFound { .. }));
    }
}
