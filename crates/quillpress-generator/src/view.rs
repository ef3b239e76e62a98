//! Typed data handed to theme templates.
//!
//! Each kind of rendered page has its own view. A view is merged over the
//! global template data by [`BuildContext::compose`](crate::BuildContext::compose),
//! and its fields win over globals with the same name.

use chrono::{Datelike, SecondsFormat};
use quillpress_core::{Archive, Author, PagerItem, Post, TagLink, config::SiteConfig};
use serde::Serialize;

/// Data shared by every view.
pub trait ViewModel: Serialize {
    /// Short name used in logs.
    fn kind(&self) -> &'static str;

    /// Title and description of the page being rendered.
    fn current(&self) -> &CurrentView;
}

/// Page-level metadata (`current.*` in templates).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurrentView {
    pub title: String,
    pub sub_title: String,
    pub description: String,
    pub link: String,
    pub slug: String,
}

impl CurrentView {
    /// Current data for a post or page: `"<title> - <site title>"`, and the
    /// document description falling back to the site description.
    #[must_use]
    pub fn for_document(post: &Post, site: &SiteConfig) -> Self {
        let description = if post.meta.description.is_empty() {
            site.description.clone()
        } else {
            post.meta.description.clone()
        };
        Self {
            title: format!("{} - {}", post.title(), site.title),
            sub_title: site.sub_title.clone(),
            description,
            link: post.link.clone(),
            slug: post.slug().to_string(),
        }
    }

    /// Current data for a site-level page such as a list or the archive.
    #[must_use]
    pub fn for_site(site: &SiteConfig, link: &str) -> Self {
        Self {
            title: site.title.clone(),
            sub_title: site.sub_title.clone(),
            description: site.description.clone(),
            link: link.to_string(),
            slug: link.to_string(),
        }
    }
}

/// A post or page as seen by templates.
#[derive(Debug, Clone, Serialize)]
pub struct PostData<'a> {
    pub title: &'a str,
    pub slug: &'a str,
    pub description: &'a str,
    pub link: &'a str,
    /// RFC 3339 timestamp.
    pub date: String,
    /// `YYYY-MM-DD`.
    pub date_text: String,
    pub year: i32,
    pub tags: &'a [TagLink],
    pub author: Option<&'a Author>,
    pub content: &'a str,
    pub brief: &'a str,
    pub comment: bool,
    pub draft: bool,
    pub lang: &'a str,
}

impl<'a> From<&'a Post> for PostData<'a> {
    fn from(post: &'a Post) -> Self {
        Self {
            title: post.title(),
            slug: post.slug(),
            description: &post.meta.description,
            link: &post.link,
            date: post.date.to_rfc3339_opts(SecondsFormat::Secs, true),
            date_text: post.date.format("%Y-%m-%d").to_string(),
            year: post.date.year(),
            tags: &post.tag_links,
            author: post.author.as_ref(),
            content: &post.content_html,
            brief: post.brief(),
            comment: post.meta.comment,
            draft: post.is_draft(),
            lang: &post.meta.lang,
        }
    }
}

/// A single post.
#[derive(Debug, Serialize)]
pub struct PostView<'a> {
    pub post: PostData<'a>,
    pub current: CurrentView,
}

impl<'a> PostView<'a> {
    #[must_use]
    pub fn new(post: &'a Post, site: &SiteConfig) -> Self {
        Self {
            post: PostData::from(post),
            current: CurrentView::for_document(post, site),
        }
    }
}

impl ViewModel for PostView<'_> {
    fn kind(&self) -> &'static str {
        "post"
    }

    fn current(&self) -> &CurrentView {
        &self.current
    }
}

/// A standalone page.
#[derive(Debug, Serialize)]
pub struct PageView<'a> {
    pub page: PostData<'a>,
    pub current: CurrentView,
}

impl<'a> PageView<'a> {
    #[must_use]
    pub fn new(page: &'a Post, site: &SiteConfig) -> Self {
        Self {
            page: PostData::from(page),
            current: CurrentView::for_document(page, site),
        }
    }
}

impl ViewModel for PageView<'_> {
    fn kind(&self) -> &'static str {
        "page"
    }

    fn current(&self) -> &CurrentView {
        &self.current
    }
}

/// One page of the chronological post list.
#[derive(Debug, Serialize)]
pub struct ListView<'a> {
    pub posts: Vec<PostData<'a>>,
    pub pager: &'a PagerItem,
    pub current: CurrentView,
}

impl<'a> ListView<'a> {
    #[must_use]
    pub fn new(posts: impl IntoIterator<Item = &'a Post>, pager: &'a PagerItem, site: &SiteConfig) -> Self {
        Self {
            posts: posts.into_iter().map(PostData::from).collect(),
            pager,
            current: CurrentView::for_site(site, &pager.link),
        }
    }
}

impl ViewModel for ListView<'_> {
    fn kind(&self) -> &'static str {
        "list"
    }

    fn current(&self) -> &CurrentView {
        &self.current
    }
}

/// One page of a tag's post list.
#[derive(Debug, Serialize)]
pub struct TagView<'a> {
    pub posts: Vec<PostData<'a>>,
    pub pager: &'a PagerItem,
    pub tag: &'a TagLink,
    pub current: CurrentView,
}

impl<'a> TagView<'a> {
    #[must_use]
    pub fn new(
        posts: impl IntoIterator<Item = &'a Post>,
        pager: &'a PagerItem,
        tag: &'a TagLink,
        site: &SiteConfig,
    ) -> Self {
        let description = if site.description.is_empty() {
            tag.name.clone()
        } else {
            format!("{} - {}", tag.name, site.description)
        };
        Self {
            posts: posts.into_iter().map(PostData::from).collect(),
            pager,
            tag,
            current: CurrentView {
                title: format!("{} - {}", tag.name, site.title),
                sub_title: site.sub_title.clone(),
                description,
                link: pager.link.clone(),
                slug: tag.link.clone(),
            },
        }
    }
}

impl ViewModel for TagView<'_> {
    fn kind(&self) -> &'static str {
        "tag"
    }

    fn current(&self) -> &CurrentView {
        &self.current
    }
}

/// Posts of one year on the archive page.
#[derive(Debug, Serialize)]
pub struct ArchiveYear<'a> {
    pub year: i32,
    pub posts: Vec<PostData<'a>>,
}

/// The archive page.
#[derive(Debug, Serialize)]
pub struct ArchiveView<'a> {
    pub archives: Vec<ArchiveYear<'a>>,
    pub current: CurrentView,
}

impl<'a> ArchiveView<'a> {
    /// Resolve archive post indices against `posts`.
    #[must_use]
    pub fn new(archives: &[Archive], posts: &'a [Post], site: &SiteConfig, link: &str) -> Self {
        let archives = archives
            .iter()
            .map(|archive| ArchiveYear {
                year: archive.year,
                posts: archive
                    .posts
                    .iter()
                    .filter_map(|&idx| posts.get(idx))
                    .map(PostData::from)
                    .collect(),
            })
            .collect();
        Self {
            archives,
            current: CurrentView::for_site(site, link),
        }
    }
}

impl ViewModel for ArchiveView<'_> {
    fn kind(&self) -> &'static str {
        "archive"
    }

    fn current(&self) -> &CurrentView {
        &self.current
    }
}

/// The not-found page.
#[derive(Debug, Serialize)]
pub struct ErrorView {
    pub current: CurrentView,
}

impl ErrorView {
    #[must_use]
    pub fn new(site: &SiteConfig, link: &str) -> Self {
        Self {
            current: CurrentView::for_site(site, link),
        }
    }
}

impl ViewModel for ErrorView {
    fn kind(&self) -> &'static str {
        "error"
    }

    fn current(&self) -> &CurrentView {
        &self.current
    }
}
