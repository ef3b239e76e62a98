//! `[extension]` settings: feed and sitemap toggles, analytics and comments.
//!
//! Analytics and comment settings are not interpreted by the generator. They
//! are handed to templates as `extension`, so themes decide what to embed.

use serde::{Deserialize, Serialize};

/// Default Atom feed output path.
pub const DEFAULT_FEED_LINK: &str = "/atom.xml";

/// Default sitemap output path.
pub const DEFAULT_SITEMAP_LINK: &str = "/sitemap.xml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionConfig {
    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub sitemap: SitemapConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub comments: CommentsConfig,
}

/// Atom feed output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Output path, also the feed's `self` link.
    #[serde(default = "default_feed_link")]
    pub link: String,
}

/// Sitemap output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_sitemap_link")]
    pub link: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub google_analytics: GoogleAnalytics,

    #[serde(default)]
    pub plausible: Plausible,

    #[serde(default)]
    pub baidu: Baidu,

    #[serde(default)]
    pub v51la: V51La,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleAnalytics {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub uid: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plausible {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub data_domain: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Baidu {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct V51La {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub ck: String,
}

/// Comment systems. At most one is used, see [`CommentsConfig::current`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub disqus: Disqus,

    #[serde(default)]
    pub valine: Valine,

    #[serde(default)]
    pub twikoo: Twikoo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Disqus {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub shortname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Valine {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_key: String,
    #[serde(default)]
    pub server_url: String,
    #[serde(default = "default_valine_cdn")]
    pub cdn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Twikoo {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub eid: String,
    #[serde(default = "default_twikoo_cdn")]
    pub cdn: String,
}

impl CommentsConfig {
    /// Name of the active comment system, checked in the order disqus,
    /// valine, twikoo.
    pub fn current(&self) -> Option<&'static str> {
        if !self.enabled {
            return None;
        }
        if self.disqus.enabled {
            Some("disqus")
        } else if self.valine.enabled {
            Some("valine")
        } else if self.twikoo.enabled {
            Some("twikoo")
        } else {
            None
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_feed_link() -> String {
    DEFAULT_FEED_LINK.to_string()
}

fn default_sitemap_link() -> String {
    DEFAULT_SITEMAP_LINK.to_string()
}

fn default_valine_cdn() -> String {
    "https://unpkg.com/valine@latest/dist/Valine.min.js".to_string()
}

fn default_twikoo_cdn() -> String {
    "https://cdn.jsdelivr.net/npm/twikoo@1.5.9/dist/twikoo.all.min.js".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            link: default_feed_link(),
        }
    }
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            link: default_sitemap_link(),
        }
    }
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disqus: Disqus::default(),
            valine: Valine::default(),
            twikoo: Twikoo::default(),
        }
    }
}

impl Default for Valine {
    fn default() -> Self {
        Self {
            enabled: false,
            app_id: String::new(),
            app_key: String::new(),
            server_url: String::new(),
            cdn: default_valine_cdn(),
        }
    }
}

impl Default for Twikoo {
    fn default() -> Self {
        Self {
            enabled: false,
            eid: String::new(),
            cdn: default_twikoo_cdn(),
        }
    }
}
