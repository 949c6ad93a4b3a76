//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. substitute the PDF backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! flatten ──▶ markup ──▶ embed ──▶ assemble ──▶ render
//! (graph DFS)  (parse)   (data:)   (HTML shell)  (browser)
//! ```
//!
//! 1. [`flatten`]  — traverse the link graph from the root, one node at a
//!    time, rewriting internal links to anchors as targets are discovered
//! 2. [`node`]     — build one document: parse, embed, assign anchors,
//!    classify outbound links
//! 3. [`markup`]   — wrap the Markdown parser; produces the owned
//!    structural [`tree`] the other stages mutate
//! 4. [`embed`]    — resolve image references to inline `data:` URIs; the
//!    only stage with network I/O
//! 5. [`assemble`] — wrap the combined body in the page shell
//! 6. [`render`]   — drive the headless browser to the final PDF

pub mod assemble;
pub mod embed;
pub mod flatten;
pub mod markup;
pub mod node;
pub mod render;
pub mod tree;
