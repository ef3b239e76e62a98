//! Atom feed generation.

use atom_syndication::{Category, Content, Entry, Feed, Link, Person, Text};
use chrono::{DateTime, Utc};
use quillpress_core::{Post, config::SiteConfig, config::full_url};
use thiserror::Error;
use tracing::debug;

/// Default feed output path.
pub const FEED_FILE: &str = quillpress_core::extension::DEFAULT_FEED_LINK;

/// Atom feed errors.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Serializing the feed failed.
    #[error("failed to encode atom feed: {0}")]
    Encode(#[from] atom_syndication::Error),
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Atom feed generator.
#[derive(Debug)]
pub struct FeedGenerator<'a> {
    site: &'a SiteConfig,
    limit: usize,
    link: &'a str,
}

impl<'a> FeedGenerator<'a> {
    /// Create a generator emitting at most `limit` entries.
    #[must_use]
    pub fn new(site: &'a SiteConfig, limit: usize) -> Self {
        Self {
            site,
            limit,
            link: FEED_FILE,
        }
    }

    /// Path the feed is published at, used for its `self` link.
    #[must_use]
    pub fn with_link(mut self, link: &'a str) -> Self {
        self.link = link;
        self
    }

    /// Build the feed from posts sorted newest first.
    ///
    /// `now` is used as the feed's updated time when there are no posts.
    pub fn build(&self, posts: &[&Post], now: DateTime<Utc>) -> Feed {
        let posts: Vec<&Post> = posts.iter().copied().take(self.limit).collect();
        debug!(count = posts.len(), limit = self.limit, "generating atom feed");

        let mut feed = Feed::default();
        feed.set_title(self.site.title.as_str());
        if !self.site.sub_title.is_empty() {
            feed.set_subtitle(Text::plain(self.site.sub_title.as_str()));
        }
        feed.set_id(self.site.base.as_str());
        feed.set_links(vec![
            Link {
                href: full_url(&self.site.base, self.link),
                rel: "self".to_string(),
                mime_type: Some("application/atom+xml".to_string()),
                ..Link::default()
            },
            Link {
                href: self.site.base.clone(),
                rel: "alternate".to_string(),
                mime_type: Some("text/html".to_string()),
                ..Link::default()
            },
        ]);

        let updated = posts.first().map_or(now, |p| p.date);
        feed.set_updated(updated.fixed_offset());
        feed.set_entries(posts.iter().map(|p| self.entry(p)).collect::<Vec<_>>());
        feed
    }

    fn entry(&self, post: &Post) -> Entry {
        let url = full_url(&self.site.base, &post.link);

        let mut entry = Entry::default();
        entry.set_title(post.title());
        entry.set_id(url.as_str());
        entry.set_links(vec![Link {
            href: url,
            rel: "alternate".to_string(),
            mime_type: Some("text/html".to_string()),
            ..Link::default()
        }]);
        entry.set_published(Some(post.date.fixed_offset()));
        entry.set_updated(post.date.fixed_offset());
        entry.set_summary(Some(Text::html(post.brief())));

        let mut content = Content::default();
        content.set_content_type(Some("html".to_string()));
        content.set_value(Some(post.content_html.clone()));
        entry.set_content(Some(content));

        if let Some(author) = &post.author {
            entry.set_authors(vec![Person {
                name: author.name.clone(),
                email: (!author.email.is_empty()).then(|| author.email.clone()),
                uri: (!author.website.is_empty()).then(|| author.website.clone()),
                extensions: Default::default(),
            }]);
        }

        entry.set_categories(
            post.tag_links
                .iter()
                .map(|tag| Category {
                    term: tag.name.clone(),
                    scheme: None,
                    label: Some(tag.name.clone()),
                })
                .collect::<Vec<_>>(),
        );

        entry
    }

    /// Build and encode the feed.
    pub fn render(&self, posts: &[&Post], now: DateTime<Utc>) -> Result<Vec<u8>> {
        let feed = self.build(posts, now);
        Ok(feed.write_to(Vec::new())?)
    }
}
