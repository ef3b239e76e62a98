//! Build orchestration.
//!
//! One call to [`generate`] is one complete, independent generation pass:
//! load the site, render it in memory, then write outputs and copy assets.
//! With [`BuildOptions::build_archive`] set, the written files are also packed
//! into a dated `.tar.gz` beside the site root.

use std::{path::PathBuf, time::Instant};

use chrono::Local;

use quillpress_core::{ConfigFile, ConfigFormat, CoreError};
use quillpress_parser::MarkdownRenderer;
use thiserror::Error;
use tracing::info;

use crate::{
    archive::{archive_name, write_archive},
    context::{BuildContext, CopyDir},
    feed::FeedError,
    output::OutputWriter,
    render::render_site,
    site::SiteData,
    sitemap::SitemapError,
    theme::TemplateError,
};

/// Generation errors that abort a pass.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Config or content error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Theme error.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A permalink format failed to compile or render.
    #[error("invalid link format '{format}': {source}")]
    LinkFormat {
        format: String,
        #[source]
        source: tera::Error,
    },

    /// Global template data could not be serialized.
    #[error("failed to build template data: {0}")]
    TemplateData(#[source] tera::Error),

    /// Feed encoding error.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Sitemap encoding error.
    #[error("sitemap error: {0}")]
    Sitemap(#[from] SitemapError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Archiving was requested but the pass wrote nothing.
    #[error("no files to archive")]
    NothingToArchive,

    /// The build archive could not be written.
    #[error("failed to write archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for generation.
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Inputs of one generation pass.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub config_file: ConfigFile,
    /// Overrides the configured output directory.
    pub output_dir: Option<PathBuf>,
    /// Include posts marked as drafts.
    pub enable_drafts: bool,
    /// The pass runs under the watch loop.
    pub enable_watch: bool,
    /// Output is served by a local server (`server.local` in templates).
    pub local_server: bool,
    /// Layer `QUILLPRESS__*` environment variables over the config file.
    pub env_overrides: bool,
    /// Pack the written files into `build-YYYY-MM-DD.tar.gz` under `root`.
    pub build_archive: bool,
    /// Directory relative config paths resolve against.
    pub root: PathBuf,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            config_file: ConfigFile {
                path: PathBuf::from("config.toml"),
                format: ConfigFormat::Toml,
            },
            output_dir: None,
            enable_drafts: false,
            enable_watch: false,
            local_server: false,
            env_overrides: false,
            build_archive: false,
            root: PathBuf::from("."),
        }
    }
}

impl BuildOptions {
    /// Options for a config file, with the site root at the file's directory.
    #[must_use]
    pub fn new(config_file: ConfigFile) -> Self {
        let root = config_file
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), PathBuf::from);
        Self {
            config_file,
            root,
            ..Self::default()
        }
    }
}

/// Build statistics.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    pub posts: usize,
    pub pages: usize,
    pub tags: usize,

    /// Number of output files written.
    pub outputs: usize,

    /// Number of static files copied.
    pub assets: usize,

    /// Writes and copies that failed.
    pub failed: usize,

    /// Where the site was written.
    pub output_dir: PathBuf,

    /// The build archive, when one was requested.
    pub archive: Option<PathBuf>,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

/// Run one full generation pass.
pub fn generate(options: &BuildOptions) -> Result<BuildStats> {
    let start = Instant::now();

    info!(
        config = %options.config_file.path.display(),
        root = %options.root.display(),
        drafts = options.enable_drafts,
        "starting build"
    );

    let mut site = SiteData::load(options)?;
    let output_dir = resolve_output_dir(options, &site)?;

    let mut ctx = BuildContext::new(&mut site, options)?;
    render_site(&mut site, &ctx, &MarkdownRenderer::new())?;

    for dir in site.theme.static_dirs() {
        ctx.add_copy_dir(CopyDir::new(dir, "."));
    }

    let writer = OutputWriter::new(&output_dir, site.config.build.enable_minify_html);
    let mut written = writer.write(&ctx);
    written.merge(writer.copy_assets(&ctx));

    let archive = if options.build_archive {
        let dest = options.root.join(archive_name(Local::now()));
        Some(write_archive(&output_dir, &ctx.written_files(), &dest)?.path)
    } else {
        None
    };

    let stats = BuildStats {
        posts: site.posts.len(),
        pages: site.pages.len(),
        tags: site.tags.len(),
        outputs: ctx.counter(),
        assets: written.assets,
        failed: written.failed,
        output_dir,
        archive,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        posts = stats.posts,
        pages = stats.pages,
        tags = stats.tags,
        outputs = stats.outputs,
        assets = stats.assets,
        failed = stats.failed,
        duration_ms = stats.duration_ms,
        "build complete"
    );

    Ok(stats)
}

/// The option override wins over the configured directory.
fn resolve_output_dir(options: &BuildOptions, site: &SiteData) -> Result<PathBuf> {
    if let Some(dir) = &options.output_dir {
        if dir.as_os_str().is_empty() {
            return Err(GenerateError::Config("output directory is empty".to_string()));
        }
        return Ok(dir.clone());
    }

    if site.config.build.output_dir.trim().is_empty() {
        return Err(GenerateError::Config("output directory is empty".to_string()));
    }
    Ok(site.config.output_dir(&site.root))
}
