//! Rendering of site data into in-memory outputs.
//!
//! Rendering runs in a fixed order. [`prepare`] assigns permalinks and
//! converts markdown, and is the last step allowed to change site data.
//! [`Renderer::render_all`] then renders posts, post lists and the index, tag
//! pages, the archive, standalone pages, the not-found page and finally the
//! feed and sitemap, which need every sitemap entry recorded before them.
//!
//! A failure to render one item is logged and the item is skipped. Only feed
//! and sitemap encoding errors abort the pass.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use quillpress_core::{
    MarkdownConverter, Pager, Post,
    content::{ARCHIVES_TEMPLATE, POST_LIST_TEMPLATE},
    link::{fill_placeholder, format_index_html},
};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::{
    build::Result,
    context::BuildContext,
    feed::FeedGenerator,
    site::SiteData,
    sitemap::SitemapGenerator,
    view::{ArchiveView, ErrorView, ListView, PageView, PostView, TagView, ViewModel},
};

/// Site index output path.
pub const INDEX_FILE: &str = "/index.html";

/// Not-found page output path.
pub const NOT_FOUND_FILE: &str = "/404.html";

/// Default sitemap output path.
pub const SITEMAP_FILE: &str = quillpress_core::extension::DEFAULT_SITEMAP_LINK;

/// Placeholder key for the tag name in the tag page link format.
const TAG_PLACEHOLDER: &str = "tag";

/// Assign permalinks and convert markdown for every post and page.
///
/// A post whose permalink cannot be built keeps an empty link and is not
/// rendered on its own.
pub fn prepare(site: &mut SiteData, ctx: &BuildContext, converter: &dyn MarkdownConverter) {
    site.posts.par_iter_mut().for_each(|post| {
        match ctx.post_link(post) {
            Ok(link) => {
                post.local_file = format_index_html(&link);
                post.link = link;
            }
            Err(e) => warn!(
                stage = "prepare",
                path = %post.source_path.display(),
                title = post.title(),
                error = %e,
                "failed to build post link, skipping"
            ),
        }
        post.convert(converter);
    });

    site.pages.par_iter_mut().for_each(|page| {
        page.link = format!("/{}", page.slug().trim_start_matches('/'));
        page.local_file = format_index_html(&page.link);
        page.convert(converter);
    });

    debug!(
        posts = site.posts.len(),
        pages = site.pages.len(),
        "content prepared"
    );
}

/// Prepare `site` and render it into `ctx`.
pub fn render_site(
    site: &mut SiteData,
    ctx: &BuildContext,
    converter: &dyn MarkdownConverter,
) -> Result<()> {
    prepare(site, ctx, converter);
    Renderer::new(site, ctx).render_all(Utc::now())
}

/// Renders prepared site data into a build context.
#[derive(Debug)]
pub struct Renderer<'a> {
    site: &'a SiteData,
    ctx: &'a BuildContext,
}

impl<'a> Renderer<'a> {
    #[must_use]
    pub fn new(site: &'a SiteData, ctx: &'a BuildContext) -> Self {
        Self { site, ctx }
    }

    /// Run every rendering stage in order.
    ///
    /// `now` stands in for the feed's updated time when there are no posts.
    pub fn render_all(&self, now: DateTime<Utc>) -> Result<()> {
        self.render_posts();
        self.render_post_lists();
        self.render_tags();
        self.render_archives();
        self.render_pages();
        self.render_error_page();
        self.render_feed(now)?;
        self.render_sitemap()?;

        info!(outputs = self.ctx.outputs_len(), "rendering finished");
        Ok(())
    }

    /// Render `view` through `template`, logging and returning `None` on failure.
    fn render_view<V: ViewModel>(&self, template: &str, view: &V) -> Option<Vec<u8>> {
        let stage = view.kind();
        let link = view.current().link.as_str();

        if !self.site.theme.has_template(template) {
            error!(stage, template, link, "template is missing, skipping");
            return None;
        }

        let context = match self.ctx.compose(view) {
            Ok(context) => context,
            Err(e) => {
                warn!(stage, template, link, error = %e, "failed to build template data, skipping");
                return None;
            }
        };

        match self.site.theme.render(template, &context) {
            Ok(buf) => Some(buf),
            Err(e) => {
                warn!(stage, template, link, error = %e, "failed to render, skipping");
                None
            }
        }
    }

    fn render_posts(&self) {
        let site = &self.site.config.site;
        self.site
            .posts
            .par_iter()
            .filter(|post| !post.link.is_empty())
            .for_each(|post| {
                let view = PostView::new(post, site);
                if let Some(buf) = self.render_view(post.template(), &view) {
                    debug!(path = %post.local_file, "post rendered");
                    self.ctx.set_output(post.local_file.clone(), buf);
                    self.ctx.add_sitemap(post.link.clone(), Some(post.date));
                }
            });
    }

    fn render_post_lists(&self) {
        let site = &self.site.config.site;
        let layout = &self.site.config.build.post_page_link_format;
        let pager = &self.site.pager;

        for page in 1..=pager.page_count() {
            let Some(item) = pager.page(page, layout) else {
                continue;
            };
            let posts = pager.slice(&self.site.posts, &item);
            let view = ListView::new(posts, &item, site);
            if let Some(buf) = self.render_view(POST_LIST_TEMPLATE, &view) {
                debug!(path = %item.local_file, "post list rendered");
                self.ctx.set_output(item.local_file.clone(), buf);
                self.ctx.add_sitemap(item.link.clone(), posts.first().map(|p| p.date));
            }
        }

        // The index is the first list page again, through the theme's index
        // template. It exists even without posts.
        let Some(item) = pager.page(1, layout) else {
            return;
        };
        let posts = pager.slice(&self.site.posts, &item);
        let view = ListView::new(posts, &item, site);
        if let Some(buf) = self.render_view(self.site.theme.index_template(), &view) {
            debug!(path = INDEX_FILE, "index rendered");
            self.ctx.set_output(INDEX_FILE, buf);
            self.ctx.add_sitemap("/", self.site.posts.first().map(|p| p.date));
        }
    }

    fn render_tags(&self) {
        let site = &self.site.config.site;
        let build = &self.site.config.build;

        self.site.tags.par_iter().for_each(|entry| {
            let tag = &entry.tag;
            let layout = fill_placeholder(&build.tag_page_link_format, TAG_PLACEHOLDER, &tag.name);
            let members: Vec<&Post> = entry
                .posts
                .iter()
                .filter_map(|&idx| self.site.posts.get(idx))
                .collect();
            let pager = Pager::new(build.post_per_page, members.len());

            for page in 1..=pager.page_count() {
                let Some(item) = pager.page(page, &layout) else {
                    continue;
                };
                let posts = pager.slice(&members, &item);
                let view = TagView::new(posts.iter().copied(), &item, tag, site);
                let Some(buf) = self.render_view(POST_LIST_TEMPLATE, &view) else {
                    continue;
                };

                let buf: Arc<[u8]> = buf.into();
                let lastmod = posts.first().map(|p| p.date);

                // The first page doubles as the tag index and shares its buffer.
                if page == 1 {
                    self.ctx.set_output(tag.local_file.clone(), Arc::clone(&buf));
                    self.ctx.add_sitemap(tag.link.clone(), lastmod);
                }
                self.ctx.set_output(item.local_file.clone(), buf);
                self.ctx.add_sitemap(item.link.clone(), lastmod);
            }

            debug!(tag = %tag.name, pages = pager.page_count(), "tag rendered");
        });
    }

    fn render_archives(&self) {
        let config = &self.site.config;
        let link = &config.build.archive_link;

        let view = ArchiveView::new(&self.site.archives, &self.site.posts, &config.site, link);
        if let Some(buf) = self.render_view(ARCHIVES_TEMPLATE, &view) {
            let path = format_index_html(link);
            debug!(path = %path, "archives rendered");
            self.ctx.set_output(path, buf);
            self.ctx.add_sitemap(link.clone(), self.site.posts.first().map(|p| p.date));
        }
    }

    fn render_pages(&self) {
        let site = &self.site.config.site;
        self.site.pages.par_iter().for_each(|page| {
            let view = PageView::new(page, site);
            if let Some(buf) = self.render_view(page.template(), &view) {
                debug!(path = %page.local_file, "page rendered");
                self.ctx.set_output(page.local_file.clone(), buf);
                self.ctx.add_sitemap(page.link.clone(), Some(page.date));
            }
        });
    }

    fn render_error_page(&self) {
        let view = ErrorView::new(&self.site.config.site, NOT_FOUND_FILE);
        if let Some(buf) = self.render_view(self.site.theme.not_found_template(), &view) {
            debug!(path = NOT_FOUND_FILE, "not found page rendered");
            self.ctx.set_output(NOT_FOUND_FILE, buf);
        }
    }

    fn render_feed(&self, now: DateTime<Utc>) -> Result<()> {
        let config = &self.site.config;
        let feed_config = &config.extension.feed;
        if !feed_config.enabled {
            debug!("atom feed disabled");
            return Ok(());
        }

        let posts = self.site.linked_posts();
        let feed = FeedGenerator::new(&config.site, config.build.feed_post_limit)
            .with_link(&feed_config.link)
            .render(&posts, now)?;
        debug!(path = %feed_config.link, "atom feed rendered");
        self.ctx.set_output(feed_config.link.as_str(), feed);
        Ok(())
    }

    fn render_sitemap(&self) -> Result<()> {
        let sitemap_config = &self.site.config.extension.sitemap;
        if !sitemap_config.enabled {
            debug!("sitemap disabled");
            return Ok(());
        }

        let entries = self.ctx.sitemap();
        let mut buf = Vec::new();
        SitemapGenerator::new(self.site.config.site.base.as_str()).write_to(&entries, &mut buf)?;
        debug!(path = %sitemap_config.link, entries = entries.len(), "sitemap rendered");
        self.ctx.set_output(sitemap_config.link.as_str(), buf);
        Ok(())
    }
}
