//! Markdown to HTML conversion using pulldown-cmark.

use std::collections::HashMap;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use quillpress_core::content::MarkdownConverter;

use crate::syntax::{SyntaxHighlighter, html_escape};

/// Link prefixes treated as external and opened in a new tab.
const EXTERNAL_PREFIXES: [&str; 3] = ["http://", "https://", "//"];

/// Markdown renderer with GitHub-flavoured extensions.
///
/// On top of plain CommonMark it assigns ids to headings, highlights fenced
/// code, opens external links in a new tab and keeps single line breaks.
#[derive(Debug)]
pub struct MarkdownRenderer {
    highlighter: SyntaxHighlighter,
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

struct PendingHeading<'a> {
    level: HeadingLevel,
    id: Option<CowStr<'a>>,
    classes: Vec<CowStr<'a>>,
    attrs: Vec<(CowStr<'a>, Option<CowStr<'a>>)>,
    text: String,
    inner: Vec<Event<'a>>,
}

struct PendingCode {
    lang: Option<String>,
    text: String,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::with_highlighter(SyntaxHighlighter::default())
    }

    /// Create a renderer with a custom syntax theme.
    pub fn with_theme(theme: &str) -> Self {
        Self::with_highlighter(SyntaxHighlighter::new(theme))
    }

    fn with_highlighter(highlighter: SyntaxHighlighter) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self {
            highlighter,
            options,
        }
    }

    /// Render markdown source to HTML.
    pub fn render(&self, source: &str) -> String {
        let mut events: Vec<Event<'_>> = Vec::new();
        let mut heading: Option<PendingHeading<'_>> = None;
        let mut code: Option<PendingCode> = None;
        let mut used_ids: HashMap<String, usize> = HashMap::new();

        for event in Parser::new_ext(source, self.options) {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code = Some(PendingCode {
                        lang,
                        text: String::new(),
                    });
                }
                Event::Text(text) if code.is_some() => {
                    if let Some(block) = code.as_mut() {
                        block.text.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(block) = code.take() {
                        let html = self.highlighter.highlight(&block.text, block.lang.as_deref());
                        events.push(Event::Html(html.into()));
                    }
                }
                Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }) => {
                    heading = Some(PendingHeading {
                        level,
                        id,
                        classes,
                        attrs,
                        text: String::new(),
                        inner: Vec::new(),
                    });
                }
                Event::End(TagEnd::Heading(level)) => {
                    if let Some(h) = heading.take() {
                        let id = match h.id {
                            Some(id) => id,
                            None => unique_id(&mut used_ids, &slugify(&h.text)).into(),
                        };
                        events.push(Event::Start(Tag::Heading {
                            level: h.level,
                            id: Some(id),
                            classes: h.classes,
                            attrs: h.attrs,
                        }));
                        events.extend(h.inner);
                        events.push(Event::End(TagEnd::Heading(level)));
                    }
                }
                other => {
                    let mapped = map_inline(other);
                    match heading.as_mut() {
                        Some(h) => {
                            if let Event::Text(t) | Event::Code(t) = &mapped {
                                h.text.push_str(t);
                            }
                            h.inner.push(mapped);
                        }
                        None => events.push(mapped),
                    }
                }
            }
        }

        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }
}

impl MarkdownConverter for MarkdownRenderer {
    fn convert(&self, source: &str) -> String {
        self.render(source)
    }
}

/// Hard-wrap soft breaks and open external links in a new tab.
fn map_inline(event: Event<'_>) -> Event<'_> {
    match event {
        Event::SoftBreak => Event::HardBreak,
        Event::Start(Tag::Link {
            dest_url, title, ..
        }) if is_external(&dest_url) => {
            let title_attr = if title.is_empty() {
                String::new()
            } else {
                format!(" title=\"{}\"", html_escape(&title))
            };
            Event::InlineHtml(
                format!(
                    "<a href=\"{}\"{title_attr} target=\"_blank\">",
                    html_escape(&dest_url)
                )
                .into(),
            )
        }
        other => other,
    }
}

fn is_external(url: &str) -> bool {
    EXTERNAL_PREFIXES.iter().any(|p| url.starts_with(p))
}

fn unique_id(used: &mut HashMap<String, usize>, base: &str) -> String {
    let base = if base.is_empty() { "section" } else { base };
    let count = used.entry(base.to_string()).or_insert(0);
    let id = if *count == 0 {
        base.to_string()
    } else {
        format!("{base}-{count}")
    };
    *count += 1;
    id
}

/// Convert heading text to an id.
fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_and_heading_ids() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Hello World\n\n## Hello World\n\nText.");

        assert!(html.contains("<h1 id=\"hello-world\">Hello World</h1>"));
        assert!(html.contains("<h2 id=\"hello-world-1\">Hello World</h2>"));
        assert!(html.contains("<p>Text.</p>"));
    }

    #[test]
    fn test_explicit_heading_id_kept() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Title {#custom}");
        assert!(html.contains("id=\"custom\""));
    }

    #[test]
    fn test_external_links_open_in_new_tab() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("[out](https://example.com) and [in](/about/)");

        assert!(html.contains("<a href=\"https://example.com\" target=\"_blank\">out</a>"));
        assert!(html.contains("<a href=\"/about/\">in</a>"));
    }

    #[test]
    fn test_soft_breaks_become_hard() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("line one\nline two");
        assert!(html.contains("line one<br />"));
    }

    #[test]
    fn test_code_block_highlighted() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```rust\nfn main() {}\n```\n");

        assert!(html.contains("<pre"));
        assert!(html.contains("main"));
        assert!(!html.contains("```"));
    }

    #[test]
    fn test_converter_trait() {
        let renderer = MarkdownRenderer::new();
        let converter: &dyn MarkdownConverter = &renderer;
        assert_eq!(converter.convert("*hi*"), "<p><em>hi</em></p>\n");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  many   spaces "), "many-spaces");
        assert_eq!(slugify("snake_case"), "snake-case");
    }
}
