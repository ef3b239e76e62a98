//! Content documents: posts and pages.
//!
//! A document is parsed from one file, then fulfilled (slug and template
//! defaults), then converted (markdown to HTML) before any renderer reads it.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{
    author::Author,
    error::{CoreError, Result},
    frontmatter::{Meta, parse_frontmatter},
    taxonomy::TagLink,
};

/// Accepted date layouts, most detailed first.
pub const DATE_LAYOUTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%d"];

/// Separator between the brief (teaser) and the rest of a post.
pub const MORE_MARKER: &str = "<!--more-->";

/// Default template for posts.
pub const POST_TEMPLATE: &str = "post.html";

/// Default template for pages.
pub const PAGE_TEMPLATE: &str = "page.html";

/// Template for paginated post lists.
pub const POST_LIST_TEMPLATE: &str = "post-list.html";

/// Template for the archive page.
pub const ARCHIVES_TEMPLATE: &str = "archives.html";

/// Markdown-to-HTML conversion used by [`Post::convert`].
pub trait MarkdownConverter: Send + Sync {
    /// Render markdown source to HTML.
    fn convert(&self, source: &str) -> String;
}

/// Kind of content document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// Dated, chronological content.
    Post,
    /// Standalone page addressed by its path.
    Page,
}

impl ContentKind {
    /// Template used when the metadata names none.
    pub fn default_template(&self) -> &'static str {
        match self {
            Self::Post => POST_TEMPLATE,
            Self::Page => PAGE_TEMPLATE,
        }
    }
}

/// A parsed content document.
#[derive(Debug, Clone)]
pub struct Post {
    pub kind: ContentKind,

    /// Metadata as written in the file, with defaults applied by `fulfill`.
    pub meta: Meta,

    /// Resolved timestamp.
    pub date: DateTime<Utc>,

    /// Resolved author, assigned after load.
    pub author: Option<Author>,

    /// Public permalink, assigned during rendering.
    pub link: String,

    /// Output path relative to the output root, assigned with `link`.
    pub local_file: String,

    /// One link per tag, in metadata order.
    pub tag_links: Vec<TagLink>,

    /// Markdown body.
    pub raw: String,

    /// Markdown before the more marker, empty when there is no marker.
    pub raw_brief: String,

    /// Rendered body.
    pub content_html: String,

    /// Rendered brief, empty when there is no marker.
    pub brief_html: String,

    pub source_path: PathBuf,
}

/// Pages share the post structure.
pub type Page = Post;

impl Post {
    /// Parse one content file. Slug and template are not defaulted yet.
    pub fn parse(path: &Path, kind: ContentKind) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let (mut meta, raw) = parse_frontmatter(&text, path)?;

        if meta.date.trim().is_empty() {
            let modified: DateTime<Utc> = fs::metadata(path)?.modified()?.into();
            meta.date = modified.format(DATE_LAYOUTS[0]).to_string();
        }

        let date = parse_date(&meta.date).ok_or_else(|| CoreError::InvalidContentDate {
            path: path.to_path_buf(),
            date: meta.date.clone(),
            layouts: DATE_LAYOUTS.join(", "),
        })?;

        let raw_brief = raw
            .find(MORE_MARKER)
            .map(|pos| raw[..pos].trim().to_string())
            .unwrap_or_default();

        let mut post = Self::new(kind, meta, date);
        post.raw = raw;
        post.raw_brief = raw_brief;
        post.source_path = path.to_path_buf();
        Ok(post)
    }

    /// Build a document from already-decoded metadata, with an empty body.
    #[must_use]
    pub fn new(kind: ContentKind, meta: Meta, date: DateTime<Utc>) -> Self {
        Self {
            kind,
            meta,
            date,
            author: None,
            link: String::new(),
            local_file: String::new(),
            tag_links: Vec::new(),
            raw: String::new(),
            raw_brief: String::new(),
            content_html: String::new(),
            brief_html: String::new(),
            source_path: PathBuf::new(),
        }
    }

    /// Apply slug and template defaults.
    ///
    /// `root` is the directory pages are addressed relative to; posts ignore it.
    pub fn fulfill(&mut self, root: &Path) {
        if self.meta.slug.is_empty() {
            self.meta.slug = match self.kind {
                ContentKind::Post => post_slug(&self.meta.title, &self.source_path),
                ContentKind::Page => page_slug(&self.source_path, root),
            };
        }
        if self.meta.template.is_empty() {
            self.meta.template = self.kind.default_template().to_string();
        }
    }

    /// Render the body and the brief through a markdown converter.
    pub fn convert(&mut self, converter: &dyn MarkdownConverter) {
        self.content_html = converter.convert(&self.raw);
        if !self.raw_brief.is_empty() {
            self.brief_html = converter.convert(&self.raw_brief);
        }
    }

    pub fn title(&self) -> &str {
        &self.meta.title
    }

    pub fn slug(&self) -> &str {
        &self.meta.slug
    }

    pub fn template(&self) -> &str {
        &self.meta.template
    }

    pub fn is_draft(&self) -> bool {
        self.meta.draft
    }

    /// Rendered brief, or the whole rendered body when there is no brief.
    pub fn brief(&self) -> &str {
        if self.brief_html.is_empty() {
            &self.content_html
        } else {
            &self.brief_html
        }
    }

    /// Author name for display, empty when unresolved.
    pub fn author_name(&self) -> &str {
        self.author.as_ref().map_or("", |a| a.name.as_str())
    }
}

/// Parse a date string against [`DATE_LAYOUTS`], first match wins.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DATE_LAYOUTS.iter().find_map(|layout| {
        NaiveDateTime::parse_from_str(text, layout)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, layout)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .map(|dt| dt.and_utc())
    })
}

fn post_slug(title: &str, path: &Path) -> String {
    if !title.is_empty() {
        return urlencoding::encode(title).into_owned();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string());
    urlencoding::encode(&stem).into_owned()
}

fn page_slug(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    let slug = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    match slug.strip_suffix("/index") {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => slug,
    }
}

/// Markdown files under `dir`, in file-name order.
fn markdown_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "content directory does not exist, skipping");
        return Vec::new();
    }

    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to read directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect()
}

/// Load every post under `dir`, newest first.
///
/// Files that fail to parse are logged and skipped. Drafts are skipped unless
/// `include_drafts` is set.
pub fn load_posts(dir: &Path, include_drafts: bool) -> Vec<Post> {
    let mut posts: Vec<Post> = markdown_files(dir)
        .into_iter()
        .filter_map(|path| match Post::parse(&path, ContentKind::Post) {
            Ok(mut post) => {
                if post.is_draft() && !include_drafts {
                    debug!(path = %path.display(), "skipping draft post");
                    return None;
                }
                post.fulfill(dir);
                Some(post)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load post");
                None
            }
        })
        .collect();

    // Stable: equal dates keep encounter order.
    posts.sort_by(|a, b| b.date.cmp(&a.date));
    posts
}

/// Load every page under `dir`, in file-name order.
pub fn load_pages(dir: &Path) -> Vec<Page> {
    markdown_files(dir)
        .into_iter()
        .filter_map(|path| match Page::parse(&path, ContentKind::Page) {
            Ok(mut page) => {
                page.fulfill(dir);
                Some(page)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load page");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    struct Upper;

    impl MarkdownConverter for Upper {
        fn convert(&self, source: &str) -> String {
            format!("<p>{}</p>", source.to_uppercase())
        }
    }

    fn write(dir: &Path, rel: &str, text: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(&path, text).expect("write");
        path
    }

    #[test]
    fn test_parse_date_layouts() {
        let full = parse_date("2024-03-05 07:08:09").expect("full");
        assert_eq!((full.hour(), full.minute(), full.second()), (7, 8, 9));

        let minutes = parse_date("2024-03-05 07:08").expect("minutes");
        assert_eq!((minutes.hour(), minutes.minute(), minutes.second()), (7, 8, 0));

        let day = parse_date("2024-03-05").expect("day");
        assert_eq!((day.year(), day.month(), day.day(), day.hour()), (2024, 3, 5, 0));

        assert!(parse_date("not-a-date").is_none());
        assert!(parse_date("05/03/2024").is_none());
    }

    #[test]
    fn test_fenced_toml_without_date_uses_mtime() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write(
            dir.path(),
            "hi.md",
            "```toml\ntitle = \"Hi\"\ntags = [\"a\"]\n```\nHello",
        );

        let mut post = Post::parse(&path, ContentKind::Post).expect("parse");
        post.fulfill(dir.path());

        let mtime: DateTime<Utc> = fs::metadata(&path)
            .expect("metadata")
            .modified()
            .expect("mtime")
            .into();
        assert_eq!(post.date.timestamp(), mtime.timestamp());
        assert_eq!(post.slug(), "Hi");
        assert_eq!(post.meta.tags, vec!["a"]);
        assert_eq!(post.template(), POST_TEMPLATE);
    }

    #[test]
    fn test_invalid_date_fails() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write(dir.path(), "bad.md", "---\ntitle: Bad\ndate: not-a-date\n---\nx");

        let err = Post::parse(&path, ContentKind::Post).unwrap_err();
        assert!(matches!(err, CoreError::InvalidContentDate { .. }));
        assert!(err.to_string().contains("it must be format as"));
    }

    #[test]
    fn test_title_is_percent_escaped_into_slug() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write(dir.path(), "a.md", "---\ntitle: Hello World/Again\ndate: 2024-01-01\n---\n");
        let mut post = Post::parse(&path, ContentKind::Post).expect("parse");
        post.fulfill(dir.path());
        assert_eq!(post.slug(), "Hello%20World%2FAgain");
    }

    #[test]
    fn test_brief_and_convert() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write(
            dir.path(),
            "a.md",
            "---\ntitle: A\ndate: 2024-01-01\n---\nteaser\n<!--more-->\nrest",
        );
        let mut post = Post::parse(&path, ContentKind::Post).expect("parse");
        assert_eq!(post.raw_brief, "teaser");

        post.convert(&Upper);
        assert_eq!(post.brief(), "<p>TEASER</p>");
        assert!(post.content_html.contains("REST"));
    }

    #[test]
    fn test_brief_falls_back_to_content() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write(dir.path(), "a.md", "---\ntitle: A\ndate: 2024-01-01\n---\nonly body");
        let mut post = Post::parse(&path, ContentKind::Post).expect("parse");
        post.convert(&Upper);
        assert!(post.raw_brief.is_empty());
        assert_eq!(post.brief(), "<p>ONLY BODY</p>");
    }

    #[test]
    fn test_page_slug_from_path() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let about = write(dir.path(), "about.md", "---\ntitle: About\n---\n");
        let docs = write(dir.path(), "docs/index.md", "---\ntitle: Docs\n---\n");
        let nested = write(dir.path(), "docs/setup.md", "---\ntitle: Setup\n---\n");

        let slugs: Vec<String> = [about, docs, nested]
            .iter()
            .map(|p| {
                let mut page = Page::parse(p, ContentKind::Page).expect("parse");
                page.fulfill(dir.path());
                assert_eq!(page.template(), PAGE_TEMPLATE);
                page.meta.slug
            })
            .collect();

        assert_eq!(slugs, vec!["about", "docs", "docs/setup"]);
    }

    #[test]
    fn test_defaults_hold_for_every_metadata_combination() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut count = 0;

        for yaml in [true, false] {
            for mask in 0u8..16 {
                let mut fields = Vec::new();
                let q = |k: &str, v: &str| {
                    if yaml {
                        format!("{k}: \"{v}\"")
                    } else {
                        format!("{k} = \"{v}\"")
                    }
                };
                if mask & 1 != 0 {
                    fields.push(q("title", "Some Title"));
                }
                if mask & 2 != 0 {
                    fields.push(q("slug", "custom-slug"));
                }
                if mask & 4 != 0 {
                    fields.push(q("template", "custom.html"));
                }
                if mask & 8 != 0 {
                    fields.push(q("date", "2023-06-07 08:09"));
                }
                let block = fields.join("\n");
                let text = if yaml {
                    format!("---\n{block}\n---\nbody")
                } else {
                    format!("```toml\n{block}\n```\nbody")
                };

                for kind in [ContentKind::Post, ContentKind::Page] {
                    count += 1;
                    let path = write(dir.path(), &format!("case-{count}.md"), &text);
                    let mut post = Post::parse(&path, kind).expect("parse");
                    post.fulfill(dir.path());

                    assert!(!post.slug().is_empty(), "empty slug for {text:?}");
                    assert!(!post.template().is_empty(), "empty template for {text:?}");
                    assert!(post.date.timestamp() > 0, "unset date for {text:?}");
                    if mask & 2 != 0 {
                        assert_eq!(post.slug(), "custom-slug");
                    }
                    if mask & 4 != 0 {
                        assert_eq!(post.template(), "custom.html");
                    }
                }
            }
        }
    }

    #[test]
    fn test_load_posts_skips_bad_files_and_drafts() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write(dir.path(), "old.md", "---\ntitle: Old\ndate: 2020-01-01\n---\nold");
        write(dir.path(), "new.md", "---\ntitle: New\ndate: 2024-01-01\n---\nnew");
        write(dir.path(), "draft.md", "---\ntitle: Draft\ndate: 2025-01-01\ndraft: true\n---\n");
        write(dir.path(), "broken.md", "---\ntitle: Broken\ndate: not-a-date\n---\n");
        write(dir.path(), "plain.md", "no metadata at all");
        write(dir.path(), "notes.txt", "ignored");

        let posts = load_posts(dir.path(), false);
        let titles: Vec<_> = posts.iter().map(Post::title).collect();
        assert_eq!(titles, vec!["New", "Old"]);

        let with_drafts = load_posts(dir.path(), true);
        assert_eq!(with_drafts[0].title(), "Draft");
        assert_eq!(with_drafts.len(), 3);
    }

    #[test]
    fn test_equal_dates_keep_encounter_order() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write(dir.path(), "a.md", "---\ntitle: A\ndate: 2024-01-01\n---\n");
        write(dir.path(), "b.md", "---\ntitle: B\ndate: 2024-01-01\n---\n");
        write(dir.path(), "c.md", "---\ntitle: C\ndate: 2024-01-01\n---\n");

        let posts = load_posts(dir.path(), false);
        let titles: Vec<_> = posts.iter().map(Post::title).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        assert!(load_posts(Path::new("/nonexistent/posts"), true).is_empty());
        assert!(load_pages(Path::new("/nonexistent/pages")).is_empty());
    }
}
