//! Metadata block (front matter) extraction for content files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Metadata fields recognized in a content file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub title: String,

    /// URL segment. Derived from the title or path when empty.
    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Raw date string, parsed later against the accepted layouts.
    #[serde(default)]
    pub date: String,

    /// Template name. Defaulted per content kind when empty.
    #[serde(default)]
    pub template: String,

    #[serde(default)]
    pub draft: bool,

    /// Whether comments are enabled for this document.
    #[serde(default = "default_comment")]
    pub comment: bool,

    /// Author name or slug.
    #[serde(default)]
    pub author: String,

    /// Language code.
    #[serde(default, alias = "language")]
    pub lang: String,
}

fn default_comment() -> bool {
    true
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            title: String::new(),
            slug: String::new(),
            description: String::new(),
            tags: Vec::new(),
            date: String::new(),
            template: String::new(),
            draft: false,
            comment: true,
            author: String::new(),
            lang: String::new(),
        }
    }
}

/// Structured-data format of a metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaFormat {
    Yaml,
    Toml,
}

/// A start/end marker pair delimiting a metadata block.
#[derive(Debug, Clone, Copy)]
pub struct Delimiter {
    pub start: &'static str,
    pub end: &'static str,
    pub format: MetaFormat,
}

/// Recognized delimiters, tried in order. The first matching prefix wins.
pub const DELIMITERS: [Delimiter; 3] = [
    Delimiter {
        start: "---\n",
        end: "---",
        format: MetaFormat::Yaml,
    },
    Delimiter {
        start: "```toml\n",
        end: "```",
        format: MetaFormat::Toml,
    },
    Delimiter {
        start: "+++\n",
        end: "+++",
        format: MetaFormat::Toml,
    },
];

/// Outcome of looking for a metadata block.
#[derive(Debug, PartialEq, Eq)]
pub enum Split<'a> {
    /// A complete block was found.
    Found {
        format: MetaFormat,
        meta: &'a str,
        body: &'a str,
    },
    /// A start marker matched but no closing marker followed.
    Unclosed(MetaFormat),
    /// No recognized start marker.
    Missing,
}

/// Split trimmed, LF-normalized content into metadata block and body.
pub fn split_frontmatter(content: &str) -> Split<'_> {
    let Some(delimiter) = DELIMITERS.iter().find(|d| content.starts_with(d.start)) else {
        return Split::Missing;
    };

    let rest = &content[delimiter.start.len()..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == delimiter.end {
            return Split::Found {
                format: delimiter.format,
                meta: &rest[..offset],
                body: rest[offset + line.len()..].trim(),
            };
        }
        offset += line.len();
    }

    Split::Unclosed(delimiter.format)
}

/// Parse a content file's text into its metadata and trimmed body.
pub fn parse_frontmatter(content: &str, path: &Path) -> Result<(Meta, String)> {
    let normalized = content.replace("\r\n", "\n");
    let trimmed = normalized.trim();

    match split_frontmatter(trimmed) {
        Split::Found { format, meta, body } => {
            let meta = decode_meta(format, meta, path)?;
            Ok((meta, body.to_string()))
        }
        Split::Unclosed(_) => Err(CoreError::UnclosedMetadata {
            path: path.to_path_buf(),
        }),
        Split::Missing => Err(CoreError::InvalidContentStart {
            path: path.to_path_buf(),
        }),
    }
}

fn decode_meta(format: MetaFormat, block: &str, path: &Path) -> Result<Meta> {
    match format {
        MetaFormat::Yaml => {
            if block.trim().is_empty() {
                return Ok(Meta::default());
            }
            serde_yaml::from_str(block).map_err(|e| CoreError::frontmatter(path, e.to_string()))
        }
        MetaFormat::Toml => {
            let mut table: toml::Table =
                toml::from_str(block).map_err(|e| CoreError::frontmatter(path, e.to_string()))?;

            // Bare TOML datetimes are accepted and handed on as text.
            if let Some(toml::Value::Datetime(dt)) = table.get("date") {
                let text = dt.to_string().replacen('T', " ", 1);
                table.insert("date".to_string(), toml::Value::String(text));
            }

            toml::Value::Table(table)
                .try_into()
                .map_err(|e: toml::de::Error| CoreError::frontmatter(path, e.to_string()))
        }
    }
}
