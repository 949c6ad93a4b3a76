//! Owned structural tree for one parsed document.
//!
//! The markup stage parses Markdown into this tree instead of straight into
//! an HTML string. Three node kinds matter to the rest of the pipeline —
//! headings, images, links — so those are materialised as typed nodes with
//! settable attributes; everything between them is kept as pre-serialised
//! HTML runs. Image sources are rewritten after parsing (embedding is
//! asynchronous) and link targets only become known once the whole graph has
//! been discovered, so both stages need a mutable value to come back to.
//! [`DocumentTree::to_html`] concatenates runs and typed nodes back into
//! body HTML in a single pass.

/// One entry in a document's node sequence.
#[derive(Debug, Clone)]
pub enum Node {
    /// A run of already-serialised HTML between addressable nodes.
    Html(String),
    Heading(Heading),
    Image(Image),
    Link(Link),
}

/// A heading with an assignable anchor id.
#[derive(Debug, Clone)]
pub struct Heading {
    /// Heading depth, 1–6.
    pub level: u8,
    /// Anchor id. Populated from an explicit `{#id}` attribute at parse
    /// time, or assigned from the visible text by the node builder.
    pub id: Option<String>,
    /// Plain text content (inline markup stripped), used to derive the id.
    pub text: String,
    /// Inner HTML with inline formatting preserved.
    pub html: String,
}

/// An image with a rewritable source.
#[derive(Debug, Clone)]
pub struct Image {
    pub src: String,
    pub alt: String,
    pub title: String,
    /// Set when embedding failed; serialisation appends a visible marker
    /// after the `<img>` so the reader can see which image is missing.
    pub embed_error: Option<String>,
}

/// A hyperlink with a rewritable target.
///
/// Links may contain images (`[![badge](b.png)](https://ci)`), so their
/// content is a nested node sequence rather than an opaque string.
#[derive(Debug, Clone)]
pub struct Link {
    pub href: String,
    pub title: String,
    pub children: Vec<Node>,
}

/// The parsed body of one source document.
#[derive(Debug, Clone, Default)]
pub struct DocumentTree {
    pub nodes: Vec<Node>,
}

impl DocumentTree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Visit every image node mutably, in document order, including images
    /// nested inside links.
    pub fn for_each_image_mut(&mut self, f: &mut impl FnMut(&mut Image)) {
        for node in &mut self.nodes {
            match node {
                Node::Image(img) => f(img),
                Node::Link(link) => {
                    for child in &mut link.children {
                        if let Node::Image(img) = child {
                            f(img);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Visit every heading node mutably, in document order.
    pub fn for_each_heading_mut(&mut self, f: &mut impl FnMut(&mut Heading)) {
        for node in &mut self.nodes {
            if let Node::Heading(h) = node {
                f(h);
            }
        }
    }

    /// Visit every link node mutably, in document order.
    ///
    /// CommonMark forbids nested links, so links only ever appear at the top
    /// level of the sequence.
    pub fn for_each_link_mut(&mut self, f: &mut impl FnMut(&mut Link)) {
        for node in &mut self.nodes {
            if let Node::Link(link) = node {
                f(link);
            }
        }
    }

    /// Serialise the tree back into body HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::with_capacity(4096);
        write_nodes(&self.nodes, &mut out);
        out
    }
}

fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Html(html) => out.push_str(html),
            Node::Heading(h) => {
                let level = h.level;
                match &h.id {
                    Some(id) => out.push_str(&format!(
                        r#"<h{level} id="{}">{}</h{level}>"#,
                        escape_attr(id),
                        h.html.trim()
                    )),
                    None => out.push_str(&format!("<h{level}>{}</h{level}>", h.html.trim())),
                }
            }
            Node::Image(img) => {
                out.push_str(&format!(
                    r#"<img src="{}" alt="{}""#,
                    escape_attr(&img.src),
                    escape_attr(&img.alt)
                ));
                if !img.title.is_empty() {
                    out.push_str(&format!(r#" title="{}""#, escape_attr(&img.title)));
                }
                out.push('>');
                if let Some(reason) = &img.embed_error {
                    out.push_str(&format!(
                        r#"<span class="image-error">⚠ image unavailable: {} ({})</span>"#,
                        escape_html(&img.src),
                        escape_html(reason)
                    ));
                }
            }
            Node::Link(link) => {
                out.push_str(&format!(r#"<a href="{}""#, escape_attr(&link.href)));
                if !link.title.is_empty() {
                    out.push_str(&format!(r#" title="{}""#, escape_attr(&link.title)));
                }
                out.push('>');
                write_nodes(&link.children, out);
                out.push_str("</a>");
            }
        }
    }
}

/// Escape text content for HTML.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value for HTML (double-quoted attributes).
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
