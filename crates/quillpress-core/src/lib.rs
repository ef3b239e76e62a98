//! quillpress core library
//!
//! Configuration, content parsing, taxonomy and pagination for the quillpress
//! static site generator.

pub mod author;
pub mod config;
pub mod content;
pub mod error;
pub mod extension;
pub mod frontmatter;
pub mod link;
pub mod pager;
pub mod taxonomy;

pub use author::Author;
pub use config::{Config, ConfigFile, ConfigFormat};
pub use content::{ContentKind, MarkdownConverter, Page, Post};
pub use error::{CoreError, Result};
pub use extension::ExtensionConfig;
pub use frontmatter::Meta;
pub use pager::{Pager, PagerItem};
pub use taxonomy::{Archive, TagLink, TagPosts};
