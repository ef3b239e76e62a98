//! Error types for the quillpress core library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types for quillpress.
///
/// Content errors (`InvalidContentStart`, `UnclosedMetadata`,
/// `InvalidContentDate`, `Frontmatter`) are fatal to a single file only.
/// `Config` errors are fatal to the whole run.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration loading or validation error.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Content file does not start with a recognized metadata delimiter.
    #[error("invalid content start in {path}")]
    InvalidContentStart { path: PathBuf },

    /// Metadata block was opened but never closed.
    #[error("unclosed metadata block in {path}")]
    UnclosedMetadata { path: PathBuf },

    /// Date string matched none of the accepted layouts.
    #[error("invalid content date '{date}' in {path}, it must be format as {layouts}")]
    InvalidContentDate {
        path: PathBuf,
        date: String,
        layouts: String,
    },

    /// Metadata block could not be decoded.
    #[error("Frontmatter error in {path}: {message}")]
    Frontmatter { path: PathBuf, message: String },

    /// File system I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic configuration crate error.
    #[error("Config crate error: {0}")]
    ConfigCrate(#[from] config::ConfigError),
}

impl CoreError {
    /// Create a new configuration error with a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new configuration error with source.
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new frontmatter error.
    pub fn frontmatter(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Frontmatter {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error only affects one content file.
    #[must_use]
    pub fn is_content_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidContentStart { .. }
                | Self::UnclosedMetadata { .. }
                | Self::InvalidContentDate { .. }
                | Self::Frontmatter { .. }
                | Self::Io(_)
        )
    }
}
