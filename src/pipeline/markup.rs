//! Markdown parsing: `pulldown-cmark` events → [`DocumentTree`].
//!
//! The parser is the markup collaborator; this module owns the contract with
//! it. A single pass over the event stream renders ordinary content straight
//! to HTML runs while materialising headings, images, and links as typed
//! nodes the later stages can query and mutate. The parser's own heading-id
//! generation is not used — explicit `{#id}` attributes are carried through,
//! anything else is left unset for the node builder to assign.

use pulldown_cmark::{
    CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd,
};

use crate::pipeline::tree::{
    escape_attr, escape_html, DocumentTree, Heading, Image, Link, Node,
};

/// Parse one document's Markdown source into a structural tree.
pub fn parse_document(markdown: &str) -> DocumentTree {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES;
    let parser = Parser::new_ext(markdown, options);

    let mut builder = TreeBuilder::default();
    for event in parser {
        builder.process_event(event);
    }
    builder.finish()
}

/// In-flight capture of a heading's inner content.
struct HeadingCapture {
    level: u8,
    id: Option<String>,
    text: String,
    html: String,
}

/// In-flight capture of a link's inner content.
struct LinkCapture {
    href: String,
    title: String,
    children: Vec<Node>,
    raw: String,
}

/// In-flight capture of an image's alt text.
struct ImageCapture {
    src: String,
    title: String,
    alt: String,
}

/// In-flight capture of a fenced or indented code block.
struct CodeCapture {
    lang: Option<String>,
    content: String,
}

#[derive(Default)]
struct TreeBuilder {
    nodes: Vec<Node>,
    raw: String,
    heading: Option<HeadingCapture>,
    link: Option<LinkCapture>,
    image: Option<ImageCapture>,
    code: Option<CodeCapture>,
    in_table_head: bool,
}

impl TreeBuilder {
    fn finish(mut self) -> DocumentTree {
        self.flush_raw();
        DocumentTree::new(self.nodes)
    }

    /// Move the accumulated HTML run into the node sequence.
    fn flush_raw(&mut self) {
        if !self.raw.is_empty() {
            self.nodes.push(Node::Html(std::mem::take(&mut self.raw)));
        }
    }

    /// Move an open link's accumulated HTML run into its children.
    fn flush_link_raw(&mut self) {
        if let Some(link) = self.link.as_mut() {
            if !link.raw.is_empty() {
                link.children.push(Node::Html(std::mem::take(&mut link.raw)));
            }
        }
    }

    /// Route a chunk of HTML to whatever is currently being captured.
    fn push_inline(&mut self, content: &str) {
        if self.image.is_some() {
            // Inline markup inside alt text is dropped; alt is plain text.
        } else if let Some(heading) = self.heading.as_mut() {
            heading.html.push_str(content);
        } else if let Some(link) = self.link.as_mut() {
            link.raw.push_str(content);
        } else {
            self.raw.push_str(content);
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::Html(html) | Event::InlineHtml(html) => self.push_inline(&html),
            Event::SoftBreak => self.soft_break(),
            Event::HardBreak => self.push_inline("<br>\n"),
            Event::Rule => self.push_inline("<hr>\n"),
            Event::TaskListMarker(checked) => self.task_list_marker(checked),
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not supported
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.push_inline("<p>"),
            Tag::Heading { level, id, .. } => {
                self.flush_raw();
                self.heading = Some(HeadingCapture {
                    level: heading_level_to_num(level),
                    id: id.map(|s| s.to_string()),
                    text: String::new(),
                    html: String::new(),
                });
            }
            Tag::BlockQuote(_) => self.push_inline("<blockquote>\n"),
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(ref info) if !info.is_empty() => info
                        .split_whitespace()
                        .next()
                        .map(|s| s.to_string()),
                    _ => None,
                };
                self.code = Some(CodeCapture {
                    lang,
                    content: String::new(),
                });
            }
            Tag::List(start) => match start {
                Some(1) => self.push_inline("<ol>"),
                Some(n) => self.push_inline(&format!(r#"<ol start="{n}">"#)),
                None => self.push_inline("<ul>"),
            },
            Tag::Item => self.push_inline("<li>"),
            Tag::Table(_) => self.push_inline("<table>"),
            Tag::TableHead => {
                self.in_table_head = true;
                self.push_inline("<thead><tr>");
            }
            Tag::TableRow => self.push_inline("<tr>"),
            Tag::TableCell => {
                self.push_inline(if self.in_table_head { "<th>" } else { "<td>" });
            }
            Tag::Emphasis => self.push_inline("<em>"),
            Tag::Strong => self.push_inline("<strong>"),
            Tag::Strikethrough => self.push_inline("<s>"),
            Tag::Superscript => self.push_inline("<sup>"),
            Tag::Subscript => self.push_inline("<sub>"),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let href = normalize_href(link_type, &dest_url);
                if self.heading.is_some() {
                    // Links inside headings stay part of the opaque inner
                    // HTML; they are not candidates for graph traversal.
                    self.push_inline(&format!(r#"<a href="{}">"#, escape_attr(&href)));
                } else {
                    self.flush_raw();
                    self.link = Some(LinkCapture {
                        href,
                        title: title.to_string(),
                        children: Vec::new(),
                        raw: String::new(),
                    });
                }
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(ImageCapture {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock | Tag::MetadataBlock(_) => {}
            Tag::DefinitionList => self.push_inline("<dl>"),
            Tag::DefinitionListTitle => self.push_inline("<dt>"),
            Tag::DefinitionListDefinition => self.push_inline("<dd>"),
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.push_inline("</p>\n"),
            TagEnd::Heading(_) => {
                if let Some(h) = self.heading.take() {
                    self.nodes.push(Node::Heading(Heading {
                        level: h.level,
                        id: h.id,
                        text: h.text.trim().to_string(),
                        html: h.html,
                    }));
                }
            }
            TagEnd::BlockQuote(_) => self.push_inline("</blockquote>\n"),
            TagEnd::CodeBlock => {
                if let Some(code) = self.code.take() {
                    let block = match code.lang {
                        Some(lang) => format!(
                            "<pre><code class=\"language-{}\">{}</code></pre>\n",
                            escape_attr(&lang),
                            escape_html(&code.content)
                        ),
                        None => format!("<pre><code>{}</code></pre>\n", escape_html(&code.content)),
                    };
                    self.push_inline(&block);
                }
            }
            TagEnd::List(ordered) => self.push_inline(if ordered { "</ol>\n" } else { "</ul>\n" }),
            TagEnd::Item => self.push_inline("</li>"),
            TagEnd::Table => self.push_inline("</tbody></table>\n"),
            TagEnd::TableHead => {
                self.in_table_head = false;
                self.push_inline("</tr></thead><tbody>");
            }
            TagEnd::TableRow => self.push_inline("</tr>"),
            TagEnd::TableCell => {
                self.push_inline(if self.in_table_head { "</th>" } else { "</td>" });
            }
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</s>"),
            TagEnd::Superscript => self.push_inline("</sup>"),
            TagEnd::Subscript => self.push_inline("</sub>"),
            TagEnd::Link => {
                if self.heading.is_some() {
                    self.push_inline("</a>");
                } else if let Some(mut link) = self.link.take() {
                    if !link.raw.is_empty() {
                        link.children.push(Node::Html(std::mem::take(&mut link.raw)));
                    }
                    self.nodes.push(Node::Link(Link {
                        href: link.href,
                        title: link.title,
                        children: link.children,
                    }));
                }
            }
            TagEnd::Image => {
                if let Some(img) = self.image.take() {
                    let image = Image {
                        src: img.src,
                        alt: img.alt,
                        title: img.title,
                        embed_error: None,
                    };
                    if let Some(heading) = self.heading.as_mut() {
                        // Images inside headings stay part of the opaque
                        // inner HTML and are not embedded.
                        heading.html.push_str(&format!(
                            r#"<img src="{}" alt="{}">"#,
                            escape_attr(&image.src),
                            escape_attr(&image.alt)
                        ));
                    } else if self.link.is_some() {
                        self.flush_link_raw();
                        if let Some(link) = self.link.as_mut() {
                            link.children.push(Node::Image(image));
                        }
                    } else {
                        self.flush_raw();
                        self.nodes.push(Node::Image(image));
                    }
                }
            }
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => {}
            TagEnd::DefinitionList => self.push_inline("</dl>\n"),
            TagEnd::DefinitionListTitle => self.push_inline("</dt>"),
            TagEnd::DefinitionListDefinition => self.push_inline("</dd>"),
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(code) = self.code.as_mut() {
            code.content.push_str(text);
        } else if let Some(image) = self.image.as_mut() {
            image.alt.push_str(text);
        } else if let Some(heading) = self.heading.as_mut() {
            heading.text.push_str(text);
            heading.html.push_str(&escape_html(text));
        } else {
            let escaped = escape_html(text);
            self.push_inline(&escaped);
        }
    }

    fn inline_code(&mut self, code: &str) {
        if let Some(image) = self.image.as_mut() {
            image.alt.push_str(code);
        } else if let Some(heading) = self.heading.as_mut() {
            heading.text.push_str(code);
            heading
                .html
                .push_str(&format!("<code>{}</code>", escape_html(code)));
        } else {
            self.push_inline(&format!("<code>{}</code>", escape_html(code)));
        }
    }

    fn soft_break(&mut self) {
        if let Some(code) = self.code.as_mut() {
            code.content.push('\n');
        } else {
            self.push_inline("\n");
        }
    }

    fn task_list_marker(&mut self, checked: bool) {
        self.push_inline(if checked {
            r#"<input type="checkbox" checked disabled> "#
        } else {
            r#"<input type="checkbox" disabled> "#
        });
    }
}

/// Convert heading level enum to number (1-6).
fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Normalise a link destination from the parser.
///
/// Email autolinks (`<user@example.com>`) arrive without a scheme; the HTML
/// form needs the `mailto:` prefix to stay clickable.
fn normalize_href(link_type: LinkType, dest: &str) -> String {
    if link_type == LinkType::Email && !dest.starts_with("mailto:") {
        format!("mailto:{dest}")
    } else {
        dest.to_string()
    }
}
