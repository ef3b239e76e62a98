//! Per-run build state.
//!
//! A [`BuildContext`] owns everything a generation pass accumulates: rendered
//! outputs keyed by path, sitemap entries, an output counter and the list
//! of files written to disk. It also
//! holds the compiled permalink templates and the global template data every
//! view is merged over.

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use chrono::{DateTime, Datelike, Utc};
use parking_lot::Mutex;
use quillpress_core::{
    Author, ExtensionConfig, Post, TagLink,
    config::{MenuItem, SiteConfig},
    link::format_index_html,
};
use serde::Serialize;
use tera::{Context, Tera};
use tracing::debug;

use crate::{
    build::{BuildOptions, GenerateError, Result},
    site::SiteData,
    sitemap::SitemapEntry,
    view::ViewModel,
};

const POST_LINK_TEMPLATE: &str = "post-link";
const TAG_LINK_TEMPLATE: &str = "tag-link";

/// Application name exposed to templates as `app.name`.
pub const APP_NAME: &str = "quillpress";

/// A directory copied verbatim into the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyDir {
    pub src: PathBuf,
    /// Destination relative to the output root.
    pub dest: PathBuf,
}

impl CopyDir {
    #[must_use]
    pub fn new(src: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
        }
    }
}

#[derive(Serialize)]
struct AppInfo {
    name: &'static str,
    version: &'static str,
    github: &'static str,
}

#[derive(Serialize)]
struct ServerInfo {
    local: bool,
}

#[derive(Serialize)]
struct ThemeInfo {
    enable_dark_mode: bool,
    show_version: bool,
}

/// Template data available to every view.
#[derive(Serialize)]
struct GlobalData<'a> {
    site: &'a SiteConfig,
    menu: &'a [MenuItem],
    tags: Vec<&'a TagLink>,
    author: Option<&'a Author>,
    authors: &'a [Author],
    app: AppInfo,
    server: ServerInfo,
    theme: ThemeInfo,
    extension: &'a ExtensionConfig,
    /// Active comment system name, if any.
    comment: Option<&'static str>,
}

#[derive(Serialize)]
struct LinkDate {
    year: i32,
    month: String,
    day: String,
}

#[derive(Serialize)]
struct PostLinkData<'a> {
    slug: &'a str,
    date: LinkDate,
}

#[derive(Serialize)]
struct TagLinkData<'a> {
    tag: &'a str,
}

/// Accumulated state of one generation pass.
#[derive(Debug)]
pub struct BuildContext {
    links: Tera,
    globals: Context,
    outputs: Mutex<BTreeMap<String, Arc<[u8]>>>,
    sitemap: Mutex<Vec<SitemapEntry>>,
    counter: AtomicUsize,
    written: Mutex<Vec<PathBuf>>,
    copy_dirs: Vec<CopyDir>,
}

impl BuildContext {
    /// Compile permalink formats, resolve every tag link in `site` and
    /// prepare the global template data.
    ///
    /// Resolving tag links is the only change made to `site`.
    pub fn new(site: &mut SiteData, options: &BuildOptions) -> Result<Self> {
        let build = &site.config.build;

        let mut links = Tera::default();
        for (name, format) in [
            (POST_LINK_TEMPLATE, &build.post_link_format),
            (TAG_LINK_TEMPLATE, &build.tag_link_format),
        ] {
            links
                .add_raw_template(name, format)
                .map_err(|source| GenerateError::LinkFormat {
                    format: format.clone(),
                    source,
                })?;
            debug!(name, format = %format, "compiled link format");
        }

        let mut copy_dirs: Vec<CopyDir> = build
            .static_assets_dir
            .iter()
            .map(|dir| CopyDir::new(site.root.join(dir), "."))
            .collect();
        copy_dirs.push(CopyDir::new(site.config.public_dir(&site.root), "."));

        let mut ctx = Self {
            links,
            globals: Context::new(),
            outputs: Mutex::new(BTreeMap::new()),
            sitemap: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            written: Mutex::new(Vec::new()),
            copy_dirs,
        };

        ctx.resolve_tag_links(site)?;
        ctx.globals = ctx.global_data(site, options)?;
        Ok(ctx)
    }

    fn resolve_tag_links(&self, site: &mut SiteData) -> Result<()> {
        let mut resolved: HashMap<String, TagLink> = HashMap::with_capacity(site.tags.len());
        for entry in &mut site.tags {
            let link = self.tag_link(&entry.tag.name)?;
            entry.tag.link = link.link;
            entry.tag.local_file = link.local_file;
            resolved.insert(entry.tag.name.clone(), entry.tag.clone());
        }

        for post in &mut site.posts {
            for tag in &mut post.tag_links {
                match resolved.get(&tag.name) {
                    Some(link) => *tag = link.clone(),
                    None => *tag = self.tag_link(&tag.name)?,
                }
            }
        }

        debug!(tags = resolved.len(), "resolved tag links");
        Ok(())
    }

    fn global_data(&self, site: &SiteData, options: &BuildOptions) -> Result<Context> {
        let config = &site.config;
        let theme = site.theme.config();
        let data = GlobalData {
            site: &config.site,
            menu: &config.menu,
            tags: site.tags.iter().map(|t| &t.tag).collect(),
            author: config.authors.first(),
            authors: &config.authors,
            app: AppInfo {
                name: APP_NAME,
                version: env!("CARGO_PKG_VERSION"),
                github: env!("CARGO_PKG_REPOSITORY"),
            },
            server: ServerInfo {
                local: options.local_server,
            },
            theme: ThemeInfo {
                enable_dark_mode: theme.enable_dark_mode,
                show_version: theme.show_version,
            },
            extension: &config.extension,
            comment: config.extension.comments.current(),
        };
        Context::from_serialize(&data).map_err(GenerateError::TemplateData)
    }

    /// Global data with `view` merged over it. View fields win.
    pub fn compose<V: ViewModel>(&self, view: &V) -> tera::Result<Context> {
        let mut context = self.globals.clone();
        context.extend(Context::from_serialize(view)?);
        Ok(context)
    }

    /// Global template data alone.
    pub fn globals(&self) -> &Context {
        &self.globals
    }

    /// Permalink of a post from the post link format.
    pub fn post_link(&self, post: &Post) -> Result<String> {
        let data = PostLinkData {
            slug: post.slug(),
            date: LinkDate {
                year: post.date.year(),
                month: format!("{:02}", post.date.month()),
                day: format!("{:02}", post.date.day()),
            },
        };
        self.render_link(POST_LINK_TEMPLATE, &data)
    }

    /// Link and output file of a tag from the tag link format.
    pub fn tag_link(&self, name: &str) -> Result<TagLink> {
        let link = self.render_link(TAG_LINK_TEMPLATE, &TagLinkData { tag: name })?;
        Ok(TagLink {
            local_file: format_index_html(&link),
            link,
            ..TagLink::new(name)
        })
    }

    fn render_link<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        let link_error = |source: tera::Error| GenerateError::LinkFormat {
            format: name.to_string(),
            source,
        };
        let context = Context::from_serialize(data).map_err(link_error)?;
        self.links.render(name, &context).map_err(link_error)
    }

    /// Record the output for `path`. A later call for the same path replaces it.
    pub fn set_output(&self, path: impl Into<String>, data: impl Into<Arc<[u8]>>) {
        self.outputs.lock().insert(path.into(), data.into());
    }

    /// Sorted snapshot of all outputs.
    pub fn outputs(&self) -> BTreeMap<String, Arc<[u8]>> {
        self.outputs.lock().clone()
    }

    pub fn output(&self, path: &str) -> Option<Arc<[u8]>> {
        self.outputs.lock().get(path).cloned()
    }

    pub fn outputs_len(&self) -> usize {
        self.outputs.lock().len()
    }

    pub fn add_sitemap(&self, loc: impl Into<String>, lastmod: Option<DateTime<Utc>>) {
        self.sitemap.lock().push(SitemapEntry::new(loc, lastmod));
    }

    /// Snapshot of sitemap entries in insertion order.
    pub fn sitemap(&self) -> Vec<SitemapEntry> {
        self.sitemap.lock().clone()
    }

    /// Count one written output. Returns the new count.
    pub fn increment_counter(&self) -> usize {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn counter(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }

    /// Record a file written under the output directory, relative to it.
    pub fn record_file(&self, path: impl Into<PathBuf>) {
        self.written.lock().push(path.into());
    }

    /// Recorded files in write order.
    pub fn written_files(&self) -> Vec<PathBuf> {
        self.written.lock().clone()
    }

    pub fn add_copy_dir(&mut self, dir: CopyDir) {
        self.copy_dirs.push(dir);
    }

    pub fn copy_dirs(&self) -> &[CopyDir] {
        &self.copy_dirs
    }
}
