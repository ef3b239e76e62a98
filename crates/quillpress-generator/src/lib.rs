//! quillpress Generator Library
//!
//! Static site generation engine for quillpress.
//!
//! # Modules
//!
//! - [`theme`] - Theme loading and template execution
//! - [`site`] - Loaded config, content and taxonomy for one pass
//! - [`context`] - Shared state of one pass: link formats, globals and outputs
//! - [`view`] - Per-template view models
//! - [`render`] - Rendering site data into in-memory outputs
//! - [`feed`] - Atom feed generation
//! - [`sitemap`] - XML sitemap generation
//! - [`output`] - Writing outputs and static assets to disk
//! - [`archive`] - Packing a build into a `.tar.gz`
//! - [`build`] - Build orchestration

pub mod archive;
pub mod build;
pub mod context;
pub mod feed;
pub mod output;
pub mod render;
pub mod site;
pub mod sitemap;
pub mod theme;
pub mod view;

pub use archive::{ArchiveInfo, archive_name, write_archive};
pub use build::{BuildOptions, BuildStats, GenerateError, generate};
pub use context::{BuildContext, CopyDir};
pub use feed::FeedGenerator;
pub use output::{OutputWriter, WriteStats, is_temp_file};
pub use render::render_site;
pub use site::SiteData;
pub use sitemap::{SitemapEntry, SitemapGenerator};
pub use theme::{TemplateError, ThemeConfig, ThemeEngine};
