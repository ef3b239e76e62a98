//! Site configuration management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    author::Author,
    error::{CoreError, Result},
    extension::ExtensionConfig,
};

/// Config file names tried by [`ConfigFile::detect`], in priority order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["config.toml", "config.yaml", "config.yml"];

/// Main configuration structure for quillpress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Site-wide settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Navigation menu entries.
    #[serde(default)]
    pub menu: Vec<MenuItem>,

    /// Configured authors. At least one is required.
    #[serde(default, rename = "author")]
    pub authors: Vec<Author>,

    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Theme location.
    #[serde(default)]
    pub theme: ThemeSettings,

    /// Watch mode timings.
    #[serde(default)]
    pub watch: WatchConfig,

    /// Feed, sitemap, analytics and comment settings.
    #[serde(default)]
    pub extension: ExtensionConfig,
}

/// Site-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title.
    #[serde(default = "default_site_title")]
    pub title: String,

    /// Site subtitle.
    #[serde(default)]
    pub sub_title: String,

    /// Base URL for the site (e.g., "https://example.com/").
    #[serde(default = "default_base")]
    pub base: String,

    /// Site description for meta tags.
    #[serde(default)]
    pub description: String,

    /// Meta keywords.
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// One navigation menu entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub title: String,
    pub link: String,
    /// Open in a new tab.
    #[serde(default)]
    pub blank: bool,
}

/// Build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Root of the content tree (`posts/`, `pages/`, `public/`).
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Output directory for the generated site.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directories copied verbatim into the output root.
    #[serde(default = "default_static_assets_dir")]
    pub static_assets_dir: Vec<String>,

    /// Post permalink template.
    #[serde(default = "default_post_link_format")]
    pub post_link_format: String,

    /// Tag index permalink template.
    #[serde(default = "default_tag_link_format")]
    pub tag_link_format: String,

    /// Paginated tag page permalink template.
    #[serde(default = "default_tag_page_link_format")]
    pub tag_page_link_format: String,

    /// Posts per list page.
    #[serde(default = "default_post_per_page")]
    pub post_per_page: usize,

    /// Paginated post list permalink template.
    #[serde(default = "default_post_page_link_format")]
    pub post_page_link_format: String,

    /// Archive page link.
    #[serde(default = "default_archive_link")]
    pub archive_link: String,

    /// Number of posts in the Atom feed.
    #[serde(default = "default_feed_post_limit")]
    pub feed_post_limit: usize,

    /// Whether to minify HTML output.
    #[serde(default = "default_true")]
    pub enable_minify_html: bool,
}

/// Where the theme lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeSettings {
    /// Theme root directory.
    #[serde(default = "default_theme_directory")]
    pub directory: String,

    /// Theme config file name, relative to the theme root.
    #[serde(default = "default_theme_config_file")]
    pub config_file: String,
}

/// Watch mode timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Quiet period after the last change before a rebuild.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Interval of the rebuild ticker.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

// Default value functions
fn default_site_title() -> String {
    "quillpress".to_string()
}

fn default_base() -> String {
    "http://localhost:18080/".to_string()
}

fn default_content_dir() -> String {
    "content".to_string()
}

fn default_output_dir() -> String {
    "./build".to_string()
}

fn default_static_assets_dir() -> Vec<String> {
    vec!["./assets".to_string()]
}

fn default_post_link_format() -> String {
    "/{{ date.year }}/{{ date.month }}/{{ slug }}/".to_string()
}

fn default_tag_link_format() -> String {
    "/tag/{{ tag }}/".to_string()
}

fn default_tag_page_link_format() -> String {
    "/tag/{{ tag }}/{{ page }}/".to_string()
}

fn default_post_per_page() -> usize {
    5
}

fn default_post_page_link_format() -> String {
    "/page/{{ page }}/".to_string()
}

fn default_archive_link() -> String {
    "/archives/".to_string()
}

fn default_feed_post_limit() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_theme_directory() -> String {
    "./themes/default".to_string()
}

fn default_theme_config_file() -> String {
    "theme_config.toml".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_tick_ms() -> u64 {
    1000
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_site_title(),
            sub_title: String::new(),
            base: default_base(),
            description: String::new(),
            keywords: Vec::new(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            output_dir: default_output_dir(),
            static_assets_dir: default_static_assets_dir(),
            post_link_format: default_post_link_format(),
            tag_link_format: default_tag_link_format(),
            tag_page_link_format: default_tag_page_link_format(),
            post_per_page: default_post_per_page(),
            post_page_link_format: default_post_page_link_format(),
            archive_link: default_archive_link(),
            feed_post_limit: default_feed_post_limit(),
            enable_minify_html: true,
        }
    }
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            directory: default_theme_directory(),
            config_file: default_theme_config_file(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut admin = Author {
            name: "admin".to_string(),
            email: "admin@example.com".to_string(),
            bio: "the administrator of this site".to_string(),
            use_gravatar: true,
            ..Author::default()
        };
        admin.fulfill();

        Self {
            site: SiteConfig::default(),
            menu: vec![
                MenuItem {
                    title: "Home".to_string(),
                    link: "/".to_string(),
                    blank: false,
                },
                MenuItem {
                    title: "Archives".to_string(),
                    link: default_archive_link(),
                    blank: false,
                },
            ],
            authors: vec![admin],
            build: BuildConfig::default(),
            theme: ThemeSettings::default(),
            watch: WatchConfig::default(),
            extension: ExtensionConfig::default(),
        }
    }
}

/// On-disk config format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Some(Self::Toml),
            Some("yaml" | "yml") => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// A resolved config file: its path and its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub format: ConfigFormat,
}

impl ConfigFile {
    /// Describe an explicit config path.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = ConfigFormat::from_path(&path).ok_or_else(|| {
            CoreError::config(format!(
                "unsupported config file extension: {}",
                path.display()
            ))
        })?;
        Ok(Self { path, format })
    }

    /// Find the first existing config file under `root`.
    pub fn detect(root: &Path) -> Option<Self> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file())
            .and_then(|path| Self::from_path(path).ok())
    }
}

impl Config {
    /// Load configuration from a TOML or YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = ConfigFile::from_path(path)?;
        Self::load_file(&file)
    }

    /// Load configuration from a resolved config file.
    pub fn load_file(file: &ConfigFile) -> Result<Self> {
        if !file.path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                file.path.display()
            )));
        }

        let content = std::fs::read_to_string(&file.path)?;
        let mut config: Config = match file.format {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| {
                CoreError::config_with_source(
                    format!("Failed to parse config file: {}", file.path.display()),
                    e,
                )
            })?,
            ConfigFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| {
                CoreError::config_with_source(
                    format!("Failed to parse config file: {}", file.path.display()),
                    e,
                )
            })?,
        };

        config.validate()?;
        config.fulfill();
        Ok(config)
    }

    /// Load configuration with `QUILLPRESS__SECTION__KEY` environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("QUILLPRESS").separator("__"))
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.validate()?;
        config.fulfill();
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.authors.is_empty() {
            return Err(CoreError::config("no authors defined"));
        }

        if self.build.post_per_page == 0 {
            return Err(CoreError::config("build.post_per_page must be greater than 0"));
        }

        if self.build.output_dir.trim().is_empty() {
            return Err(CoreError::config("build.output_dir cannot be empty"));
        }

        let ext = &self.extension;
        if ext.feed.enabled && ext.feed.link.trim().is_empty() {
            return Err(CoreError::config("extension.feed.link cannot be empty"));
        }
        if ext.sitemap.enabled && ext.sitemap.link.trim().is_empty() {
            return Err(CoreError::config("extension.sitemap.link cannot be empty"));
        }

        if self.site.base.is_empty() {
            tracing::warn!("site.base is empty, feed and sitemap links will be relative");
        }

        Ok(())
    }

    /// Fill derived author fields.
    fn fulfill(&mut self) {
        for author in &mut self.authors {
            author.fulfill();
        }
    }

    /// Get the full URL for a path.
    pub fn full_url(&self, path: &str) -> String {
        full_url(&self.site.base, path)
    }

    /// Root of the content tree, relative to `root`.
    pub fn content_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.build.content_dir)
    }

    /// Configured output directory, relative to `root`.
    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(self.build.output_dir.trim())
    }

    /// Directory holding posts, relative to `root`.
    pub fn posts_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.build.content_dir).join("posts")
    }

    /// Directory holding standalone pages, relative to `root`.
    pub fn pages_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.build.content_dir).join("pages")
    }

    /// Directory copied verbatim to the output root, relative to `root`.
    pub fn public_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.build.content_dir).join("public")
    }

    /// Theme root directory, relative to `root`.
    pub fn theme_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.theme.directory)
    }
}

/// Join a base URL and a path with exactly one slash between them.
pub fn full_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn create_test_config() -> String {
        r#"
[site]
title = "Test Site"
sub_title = "notes"
base = "https://example.com/"
keywords = ["rust", "blog"]

[[menu]]
title = "Home"
link = "/"

[[menu]]
title = "GitHub"
link = "https://github.com"
blank = true

[[author]]
name = "alice"
email = "alice@example.com"
use_gravatar = true

[author.social]
github = "https://github.com/alice"

[build]
output_dir = "dist"
post_per_page = 3
enable_minify_html = false

[theme]
directory = "themes/plain"

[watch]
debounce_ms = 250

[extension.sitemap]
enabled = false

[extension.analytics.google_analytics]
enabled = true
uid = "G-123"
"#
        .to_string()
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&config_path).expect("create file");
        file.write_all(create_test_config().as_bytes())
            .expect("write");

        let config = Config::load(&config_path).expect("load config");

        assert_eq!(config.site.title, "Test Site");
        assert_eq!(config.site.keywords, vec!["rust", "blog"]);
        assert_eq!(config.menu.len(), 2);
        assert!(config.menu[1].blank);
        assert_eq!(config.authors.len(), 1);
        assert_eq!(config.authors[0].slug, "/author/alice/");
        assert!(config.authors[0].avatar.starts_with("https://www.gravatar.com/avatar/"));
        assert_eq!(config.build.output_dir, "dist");
        assert_eq!(config.build.post_per_page, 3);
        assert!(!config.build.enable_minify_html);
        assert_eq!(config.theme.directory, "themes/plain");
        assert_eq!(config.theme.config_file, "theme_config.toml");
        assert_eq!(config.watch.debounce_ms, 250);
        assert_eq!(config.watch.tick_ms, 1000);
        assert!(config.extension.feed.enabled);
        assert!(!config.extension.sitemap.enabled);
        assert_eq!(config.extension.analytics.google_analytics.uid, "G-123");
    }

    #[test]
    fn test_config_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("config.toml");
        let minimal_config = r#"
[[author]]
name = "bob"
"#;
        std::fs::write(&config_path, minimal_config).expect("write");

        let config = Config::load(&config_path).expect("load config");

        assert_eq!(config.build.output_dir, "./build");
        assert_eq!(config.build.static_assets_dir, vec!["./assets"]);
        assert_eq!(config.build.post_per_page, 5);
        assert_eq!(config.build.archive_link, "/archives/");
        assert_eq!(config.build.feed_post_limit, 10);
        assert!(config.build.enable_minify_html);
        assert_eq!(config.theme.directory, "./themes/default");
    }

    #[test]
    fn test_load_yaml_config() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("config.yaml");
        let yaml = r#"
site:
  title: Yaml Site
author:
  - name: carol
    email: carol@example.com
build:
  post_per_page: 2
"#;
        std::fs::write(&config_path, yaml).expect("write");

        let config = Config::load(&config_path).expect("load config");
        assert_eq!(config.site.title, "Yaml Site");
        assert_eq!(config.authors[0].name, "carol");
        assert_eq!(config.build.post_per_page, 2);
    }

    #[test]
    fn test_no_authors_is_config_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "[site]\ntitle = \"x\"\n").expect("write");

        let err = Config::load(&config_path).unwrap_err();
        assert!(err.to_string().contains("no authors defined"));
    }

    #[test]
    fn test_empty_extension_link_rejected() {
        let mut config = Config::default();
        config.extension.feed.link = " ".to_string();
        assert!(config.validate().is_err());

        config.extension.feed.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_post_per_page_rejected() {
        let mut config = Config::default();
        config.build.post_per_page = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_full_url() {
        let config = Config::default();
        assert_eq!(
            config.full_url("/2024/01/hello/"),
            "http://localhost:18080/2024/01/hello/"
        );
        assert_eq!(full_url("https://a.com", "b"), "https://a.com/b");
        assert_eq!(full_url("https://a.com///", "//b"), "https://a.com/b");
    }

    #[test]
    fn test_detect_config_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        assert!(ConfigFile::detect(dir.path()).is_none());

        std::fs::write(dir.path().join("config.yml"), "").expect("write");
        let found = ConfigFile::detect(dir.path()).expect("detect");
        assert_eq!(found.format, ConfigFormat::Yaml);

        std::fs::write(dir.path().join("config.toml"), "").expect("write");
        let found = ConfigFile::detect(dir.path()).expect("detect");
        assert_eq!(found.format, ConfigFormat::Toml);
    }

    #[test]
    fn test_config_not_found() {
        let result = Config::load(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = Config::load(Path::new("config.ini"));
        assert!(result.unwrap_err().to_string().contains("unsupported"));
    }
}
