//! Sitemap generation.
//!
//! Generates the XML sitemap from entries accumulated during rendering.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use quillpress_core::config::full_url;
use thiserror::Error;
use tracing::debug;

/// Sitemap protocol namespace.
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Sitemap generation errors.
#[derive(Debug, Error)]
pub enum SitemapError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sitemap operations.
pub type Result<T> = std::result::Result<T, SitemapError>;

/// A sitemap URL entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    /// Site-relative link, joined with the base URL on output.
    pub loc: String,

    /// Last modification date.
    pub lastmod: Option<DateTime<Utc>>,
}

impl SitemapEntry {
    #[must_use]
    pub fn new(loc: impl Into<String>, lastmod: Option<DateTime<Utc>>) -> Self {
        Self {
            loc: loc.into(),
            lastmod,
        }
    }
}

/// Sitemap generator.
#[derive(Debug)]
pub struct SitemapGenerator {
    base: String,
}

impl SitemapGenerator {
    /// Create a generator for a site rooted at `base`.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Generate sitemap XML.
    ///
    /// Entries are ordered by location and duplicate locations collapse to the
    /// first one, so the document does not depend on rendering order.
    pub fn generate(&self, entries: &[SitemapEntry]) -> String {
        let mut entries = entries.to_vec();
        entries.sort_by(|a, b| a.loc.cmp(&b.loc));
        entries.dedup_by(|a, b| a.loc == b.loc);

        debug!(count = entries.len(), "generating sitemap");

        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NAMESPACE}">"#));
        xml.push('\n');

        for entry in &entries {
            xml.push_str(&self.entry_to_xml(entry));
        }

        xml.push_str("</urlset>\n");
        xml
    }

    fn entry_to_xml(&self, entry: &SitemapEntry) -> String {
        let mut xml = String::from("  <url>\n");
        xml.push_str(&format!(
            "    <loc>{}</loc>\n",
            escape_xml(&full_url(&self.base, &entry.loc))
        ));

        if let Some(lastmod) = &entry.lastmod {
            xml.push_str(&format!(
                "    <lastmod>{}</lastmod>\n",
                lastmod.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }

        xml.push_str("  </url>\n");
        xml
    }

    /// Write sitemap to a writer.
    pub fn write_to<W: Write>(&self, entries: &[SitemapEntry], writer: &mut W) -> Result<()> {
        let xml = self.generate(entries);
        writer.write_all(xml.as_bytes())?;
        Ok(())
    }
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
