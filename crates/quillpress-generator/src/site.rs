//! Everything one generation pass reads: config, content, taxonomy and theme.

use std::path::PathBuf;

use quillpress_core::{
    Archive, Config, Page, Pager, Post, TagLink, TagPosts,
    author::resolve_author,
    content::{load_pages, load_posts},
    taxonomy::{build_archives, build_tag_index},
};
use tracing::{debug, info};

use crate::{
    build::{BuildOptions, Result},
    theme::ThemeEngine,
};

/// Loaded site content. Built fresh for every pass.
#[derive(Debug)]
pub struct SiteData {
    pub config: Config,
    /// Directory relative config paths resolve against.
    pub root: PathBuf,
    /// Posts, newest first.
    pub posts: Vec<Post>,
    pub pages: Vec<Page>,
    /// Tags in alphabetical order.
    pub tags: Vec<TagPosts>,
    /// Pagination of the main post list.
    pub pager: Pager,
    /// Yearly archives, newest year first.
    pub archives: Vec<Archive>,
    pub theme: ThemeEngine,
}

impl SiteData {
    /// Load config, content and theme.
    ///
    /// Config and theme errors are fatal. Content files that fail to load are
    /// logged and left out.
    pub fn load(options: &BuildOptions) -> Result<Self> {
        let config = if options.env_overrides {
            Config::load_with_env(&options.config_file.path)?
        } else {
            Config::load_file(&options.config_file)?
        };
        let root = options.root.clone();

        let posts = load_posts(&config.posts_dir(&root), options.enable_drafts);
        let pages = load_pages(&config.pages_dir(&root));
        debug!(posts = posts.len(), pages = pages.len(), "content loaded");

        let theme = ThemeEngine::load(&config.theme_dir(&root), &config.theme.config_file)?;

        let site = Self::from_parts(config, root, posts, pages, theme);
        info!(
            posts = site.posts.len(),
            pages = site.pages.len(),
            tags = site.tags.len(),
            "site data loaded"
        );
        Ok(site)
    }

    /// Assemble site data from already loaded parts.
    ///
    /// Assigns authors and tag links to content, then derives tags, the post
    /// pager and archives. `posts` must be sorted newest first.
    #[must_use]
    pub fn from_parts(
        config: Config,
        root: PathBuf,
        mut posts: Vec<Post>,
        mut pages: Vec<Page>,
        theme: ThemeEngine,
    ) -> Self {
        for post in posts.iter_mut().chain(pages.iter_mut()) {
            post.author = Some(resolve_author(&config.authors, &post.meta.author));
            post.tag_links = unique_tags(&post.meta.tags)
                .into_iter()
                .map(TagLink::new)
                .collect();
        }

        let tags = build_tag_index(&posts);
        let pager = Pager::new(config.build.post_per_page, posts.len());
        let archives = build_archives(&posts);

        Self {
            config,
            root,
            posts,
            pages,
            tags,
            pager,
            archives,
            theme,
        }
    }

    /// Posts that received a permalink during preparation.
    pub fn linked_posts(&self) -> Vec<&Post> {
        self.posts.iter().filter(|p| !p.link.is_empty()).collect()
    }
}

/// Trimmed, non-empty tags in first-seen order.
fn unique_tags(tags: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
